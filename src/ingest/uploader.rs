//! Turns a directory of image files into catalog assets.
//!
//! - Discovery with walkdir, image types only, sorted by path
//! - Declared size from the file header, with configured fallbacks
//! - Dominant color through the palette queue, replacing the placeholder
//! - Progress reporting via channels

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{ensure, Context, Result};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::header::read_dimensions;
use crate::config::{IngestConfig, PaletteConfig};
use crate::models::{Asset, MediaKind};
use crate::palette::{ExtractionRequest, PaletteQueue};

/// Upper bound on extraction requests in flight at once.
const IN_FLIGHT: usize = 64;

const DEFAULT_ALT: &str = "Uploaded image";

/// Progress information sent during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestProgress {
    Started { path: PathBuf },
    /// Image files found, before any are read.
    Discovered { count: usize },
    /// An asset was created with placeholder color.
    Added { id: String, path: PathBuf },
    /// A directory entry could not be read.
    FileError { path: PathBuf, error: String },
    /// Extraction finished for an asset; `None` keeps the placeholder.
    ColorResolved { id: String, hex: Option<String> },
    Completed { total: usize, colored: usize, errors: usize },
}

/// Result of a completed ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// New assets in path order.
    pub assets: Vec<Asset>,
    /// Assets whose placeholder was replaced by an extracted color.
    pub colored: usize,
    pub errors: usize,
}

/// Ingests upload directories.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    config: IngestConfig,
    palette: PaletteConfig,
    folder: Option<String>,
}

impl Ingestor {
    pub fn new(config: IngestConfig, palette: PaletteConfig) -> Self {
        Self {
            config,
            palette,
            folder: None,
        }
    }

    /// Places new uploads in the given folder.
    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder.filter(|f| !f.is_empty() && !f.eq_ignore_ascii_case("all"));
        self
    }

    /// Ingests a directory, blocking the calling task until colors resolve.
    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        let dir = dir.to_path_buf();
        let this = self.clone();

        task::spawn_blocking(move || this.ingest_sync(&dir, None))
            .await
            .context("Ingest task panicked")?
    }

    /// Ingests a directory with progress reporting via a channel.
    pub fn ingest_with_progress(
        &self,
        dir: PathBuf,
    ) -> (
        mpsc::Receiver<IngestProgress>,
        task::JoinHandle<Result<IngestReport>>,
    ) {
        let this = self.clone();
        let (tx, rx) = mpsc::channel(100);

        let handle = task::spawn_blocking(move || this.ingest_sync(&dir, Some(&tx)));
        let wrapped_handle =
            task::spawn(async move { handle.await.context("Ingest task panicked")? });

        (rx, wrapped_handle)
    }

    fn ingest_sync(
        &self,
        dir: &Path,
        tx: Option<&mpsc::Sender<IngestProgress>>,
    ) -> Result<IngestReport> {
        let send = |event: IngestProgress| {
            if let Some(tx) = tx {
                let _ = tx.blocking_send(event);
            }
        };

        ensure!(dir.is_dir(), "Upload path is not a directory: {}", dir.display());
        info!(path = %dir.display(), "Starting ingest");
        send(IngestProgress::Started { path: dir.to_path_buf() });

        let (paths, mut errors) = self.discover_files(dir, &send);
        send(IngestProgress::Discovered { count: paths.len() });

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let mut assets: Vec<Asset> = paths
            .iter()
            .enumerate()
            .map(|(idx, path)| {
                let asset = self.build_asset(format!("upload-{stamp}-{idx}"), path);
                send(IngestProgress::Added {
                    id: asset.id.clone(),
                    path: path.clone(),
                });
                asset
            })
            .collect();

        let colors = match self.extract_colors(&assets, &paths, &send) {
            Ok(colors) => colors,
            Err(e) => {
                warn!(
                    error = %format!("{e:#}"),
                    "Color extraction unavailable, keeping placeholders"
                );
                errors += 1;
                HashMap::new()
            }
        };

        let mut colored = 0;
        for asset in &mut assets {
            if let Some(hex) = colors.get(&asset.id) {
                asset.dominant_color = Some(hex.clone());
                colored += 1;
            }
        }

        info!(total = assets.len(), colored, errors, "Ingest complete");
        send(IngestProgress::Completed {
            total: assets.len(),
            colored,
            errors,
        });

        Ok(IngestReport {
            assets,
            colored,
            errors,
        })
    }

    /// Image files under `dir` in path order, plus the number of unreadable entries.
    fn discover_files(&self, dir: &Path, send: &impl Fn(IngestProgress)) -> (Vec<PathBuf>, usize) {
        let mut walker = WalkDir::new(dir);
        if !self.config.recursive {
            walker = walker.max_depth(1);
        } else if self.config.max_depth > 0 {
            walker = walker.max_depth(self.config.max_depth);
        }

        let mut paths = Vec::new();
        let mut errors = 0;

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    send(IngestProgress::FileError {
                        path,
                        error: e.to_string(),
                    });
                    errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            if mime_for(entry.path()).is_some_and(|m| m.starts_with("image/")) {
                paths.push(entry.into_path());
            }
        }

        paths.sort();
        debug!(count = paths.len(), "Discovered uploads");
        (paths, errors)
    }

    fn build_asset(&self, id: String, path: &Path) -> Asset {
        let fallback = (self.config.default_width, self.config.default_height);
        let (width, height) = read_dimensions(path).unwrap_or(fallback);

        let mut asset = Asset::new(id, path.to_string_lossy());
        asset.mime = mime_for(path).unwrap_or("image/jpeg").to_string();
        asset.has_people = false;
        asset.dominant_color = Some(self.config.placeholder_color.clone());
        asset.width = Some(width);
        asset.height = Some(height);
        asset.alt = Some(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_ALT.to_string()),
        );
        asset.folder = self.folder.clone();
        asset
    }

    /// Runs every upload through the palette queue and collects the colors
    /// that resolved.
    fn extract_colors(
        &self,
        assets: &[Asset],
        paths: &[PathBuf],
        send: &impl Fn(IngestProgress),
    ) -> Result<HashMap<String, String>> {
        let mut colors = HashMap::new();
        if assets.is_empty() {
            return Ok(colors);
        }

        let queue = PaletteQueue::new(self.palette.workers, self.palette.options())
            .context("Failed to start palette workers")?;
        let timeout = self.palette.timeout();

        let mut requests = assets
            .iter()
            .zip(paths)
            .map(|(asset, path)| ExtractionRequest::from_path(asset.id.clone(), path.clone()));
        let mut outstanding = 0usize;

        loop {
            while outstanding < IN_FLIGHT {
                let Some(req) = requests.next() else { break };
                let id = req.id.clone();
                if queue.request(req) {
                    outstanding += 1;
                } else {
                    warn!(%id, "Extraction not accepted, keeping placeholder");
                    send(IngestProgress::ColorResolved { id, hex: None });
                }
            }

            if outstanding == 0 {
                break;
            }

            let Some(result) = queue.wait_result(timeout) else {
                warn!(
                    outstanding,
                    ?timeout,
                    "Timed out waiting for extraction, keeping placeholders"
                );
                queue.cancel_all();
                break;
            };
            outstanding -= 1;

            if let Some(error) = &result.error {
                debug!(id = %result.id, %error, "No dominant color for upload");
            }
            send(IngestProgress::ColorResolved {
                id: result.id.clone(),
                hex: result.hex.clone(),
            });
            if let Some(hex) = result.hex {
                colors.insert(result.id, hex);
            }
        }

        Ok(colors)
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MediaKind::mime_for_extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::tempdir;

    fn swatch(path: &Path, w: u32, h: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(w, h, Rgba(color)).save(path).unwrap();
    }

    fn ingestor() -> Ingestor {
        Ingestor::new(IngestConfig::default(), PaletteConfig::default())
    }

    #[tokio::test]
    async fn test_ingest_builds_assets() {
        let dir = tempdir().unwrap();
        swatch(&dir.path().join("a.png"), 300, 100, [0x26, 0x46, 0x53, 255]);
        swatch(&dir.path().join("b.png"), 20, 40, [0xff, 0x00, 0x66, 255]);
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let report = ingestor()
            .with_folder(Some("ferier".into()))
            .ingest(dir.path())
            .await
            .unwrap();

        assert_eq!(report.assets.len(), 2);
        assert_eq!(report.colored, 2);
        assert_eq!(report.errors, 0);

        let a = &report.assets[0];
        assert!(a.id.starts_with("upload-") && a.id.ends_with("-0"));
        assert_eq!(a.mime, "image/png");
        assert!(!a.has_people);
        assert_eq!((a.width, a.height), (Some(300), Some(100)));
        assert_eq!(a.dominant_color.as_deref(), Some("#224455"));
        assert_eq!(a.alt.as_deref(), Some("a.png"));
        assert_eq!(a.folder.as_deref(), Some("ferier"));

        let b = &report.assets[1];
        assert!(b.id.ends_with("-1"));
        assert_eq!(b.dominant_color.as_deref(), Some("#ff0066"));
    }

    #[tokio::test]
    async fn test_undecodable_upload_keeps_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.jpg"), b"not really a jpeg").unwrap();

        let report = ingestor().ingest(dir.path()).await.unwrap();
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.colored, 0);

        let asset = &report.assets[0];
        assert_eq!(asset.mime, "image/jpeg");
        assert_eq!((asset.width, asset.height), (Some(1200), Some(800)));
        assert_eq!(asset.dominant_color.as_deref(), Some("#a18072"));
        assert_eq!(asset.folder, None);
    }

    #[tokio::test]
    async fn test_recursive_and_flat() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        swatch(&dir.path().join("top.png"), 4, 4, [0, 0, 0, 255]);
        swatch(&nested.join("deep.png"), 4, 4, [0, 0, 0, 255]);

        let report = ingestor().ingest(dir.path()).await.unwrap();
        assert_eq!(report.assets.len(), 2);

        let flat = IngestConfig {
            recursive: false,
            ..IngestConfig::default()
        };
        let report = Ingestor::new(flat, PaletteConfig::default())
            .ingest(dir.path())
            .await
            .unwrap();
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].alt.as_deref(), Some("top.png"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(ingestor().ingest(&dir.path().join("absent")).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let report = ingestor().ingest(dir.path()).await.unwrap();
        assert!(report.assets.is_empty());
        assert_eq!(report.colored, 0);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let dir = tempdir().unwrap();
        swatch(&dir.path().join("one.png"), 8, 8, [0x34, 0xc7, 0x59, 255]);

        let (mut rx, handle) = ingestor().ingest_with_progress(dir.path().to_path_buf());
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let report = handle.await.unwrap().unwrap();

        assert!(matches!(events.first(), Some(IngestProgress::Started { .. })));
        assert!(events.contains(&IngestProgress::Discovered { count: 1 }));
        assert!(events.iter().any(|e| matches!(
            e,
            IngestProgress::ColorResolved { hex: Some(hex), .. } if hex == "#33cc55"
        )));
        assert_eq!(
            events.last(),
            Some(&IngestProgress::Completed {
                total: 1,
                colored: 1,
                errors: 0
            })
        );
        assert_eq!(report.assets[0].dominant_color.as_deref(), Some("#33cc55"));
    }

    #[test]
    fn test_all_folder_means_none() {
        let ingestor = ingestor().with_folder(Some("all".into()));
        assert_eq!(ingestor.folder, None);
    }
}
