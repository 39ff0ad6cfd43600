//! The data the browser runs over: curated stock assets and uploaded files.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Asset;

/// A record on the files page, as the command palette sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    pub id: String,
    pub title: Option<String>,
    pub filename: Option<String>,
    pub alt: Option<String>,
    pub src: Option<String>,
    pub thumb: Option<String>,
    #[serde(alias = "folderName")]
    pub folder_name: Option<String>,
    #[serde(alias = "folderId")]
    pub folder_id: Option<String>,
    pub tags: Vec<String>,
}

impl FileRecord {
    /// Title for display: title, filename, alt text, then id.
    pub fn display_title(&self) -> &str {
        [&self.title, &self.filename, &self.alt]
            .into_iter()
            .find_map(|s| s.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.id)
    }
}

/// Stock and file collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub stock: Vec<Asset>,
    pub files: Vec<FileRecord>,
}

struct StockRow {
    id: &'static str,
    photo: u32,
    title: &'static str,
    tags: &'static [&'static str],
    mime: &'static str,
    has_people: bool,
    color: &'static str,
    alt: &'static str,
}

const STOCK_ROWS: &[StockRow] = &[
    StockRow {
        id: "st-001",
        photo: 1003,
        title: "Forest river",
        tags: &["nature", "forest", "river", "water"],
        mime: "image/jpeg",
        has_people: false,
        color: "#3a5a44",
        alt: "Forest river",
    },
    StockRow {
        id: "st-002",
        photo: 1015,
        title: "Mountains lake",
        tags: &["mountain", "lake", "nature"],
        mime: "image/jpeg",
        has_people: false,
        color: "#6b879a",
        alt: "Mountains",
    },
    StockRow {
        id: "st-003",
        photo: 1016,
        title: "Beach",
        tags: &["beach", "ocean", "summer"],
        mime: "image/jpeg",
        has_people: true,
        color: "#8ac0d6",
        alt: "Beach",
    },
    StockRow {
        id: "st-004",
        photo: 1018,
        title: "Forest trail",
        tags: &["forest", "trail", "green"],
        mime: "image/jpeg",
        has_people: false,
        color: "#2e5b3c",
        alt: "Forest",
    },
    StockRow {
        id: "st-005",
        photo: 1020,
        title: "Lake view",
        tags: &["lake", "mountain", "travel"],
        mime: "image/jpeg",
        has_people: true,
        color: "#4a7a8e",
        alt: "Lake",
    },
    StockRow {
        id: "st-006",
        photo: 1011,
        title: "City skyline",
        tags: &["city", "skyline", "urban"],
        mime: "image/jpeg",
        has_people: true,
        color: "#2a2a2a",
        alt: "City skyline",
    },
    StockRow {
        id: "st-007",
        photo: 1012,
        title: "City bridge",
        tags: &["city", "bridge", "architecture"],
        mime: "image/jpeg",
        has_people: false,
        color: "#4b5b6a",
        alt: "Bridge",
    },
    StockRow {
        id: "st-008",
        photo: 1013,
        title: "Street life",
        tags: &["street", "city", "people"],
        mime: "image/jpeg",
        has_people: true,
        color: "#6f7a88",
        alt: "Street",
    },
    StockRow {
        id: "st-009",
        photo: 1014,
        title: "Harbor",
        tags: &["harbor", "sea", "city"],
        mime: "image/jpeg",
        has_people: false,
        color: "#8aa0b5",
        alt: "Harbor",
    },
    StockRow {
        id: "st-v001",
        photo: 1054,
        title: "Line shapes vector",
        tags: &["vector", "lines", "abstract"],
        mime: "image/svg+xml",
        has_people: false,
        color: "#3a86ff",
        alt: "Vector lines",
    },
    StockRow {
        id: "st-v002",
        photo: 1055,
        title: "Color blocks vector",
        tags: &["vector", "abstract", "blocks"],
        mime: "image/svg+xml",
        has_people: false,
        color: "#ff006e",
        alt: "Vector blocks",
    },
    StockRow {
        id: "st-v003",
        photo: 1050,
        title: "Pattern vector",
        tags: &["vector", "pattern"],
        mime: "image/svg+xml",
        has_people: false,
        color: "#a1b2c3",
        alt: "Vector pattern",
    },
    StockRow {
        id: "st-vid001",
        photo: 1062,
        title: "Cinematic waves",
        tags: &["video", "ocean"],
        mime: "video/mp4",
        has_people: false,
        color: "#264653",
        alt: "Video: waves",
    },
    StockRow {
        id: "st-vid002",
        photo: 1063,
        title: "City timelapse",
        tags: &["video", "city"],
        mime: "video/mp4",
        has_people: false,
        color: "#2a2a2a",
        alt: "Video: city",
    },
    StockRow {
        id: "st-vid003",
        photo: 1064,
        title: "Forest b-roll",
        tags: &["video", "forest"],
        mime: "video/mp4",
        has_people: false,
        color: "#2e5b3c",
        alt: "Video: forest",
    },
];

const FILE_ROWS: &[(&str, &str, &str, &str, &[&str])] = &[
    (
        "fi-001",
        "Team meeting photo",
        "team-photo.jpg",
        "People",
        &["office", "people", "team"],
    ),
    ("fi-002", "Product mockup", "product-mockup.jpg", "Design", &["design", "mockup", "branding"]),
    ("fi-003", "Office workspace", "workspace.jpg", "Office", &["workspace", "interior", "office"]),
    (
        "fi-004",
        "Nature background",
        "nature.jpg",
        "Backgrounds",
        &["nature", "background", "green"],
    ),
];

static DEMO: Lazy<Catalog> = Lazy::new(|| {
    let stock = STOCK_ROWS
        .iter()
        .map(|row| {
            let src = format!("https://picsum.photos/id/{}/1600/1066", row.photo);
            let mut asset = Asset::new(row.id, src);
            asset.title = row.title.to_string();
            asset.tags = row.tags.iter().map(|t| t.to_string()).collect();
            asset.mime = row.mime.to_string();
            asset.has_people = row.has_people;
            asset.dominant_color = Some(row.color.to_string());
            asset.width = Some(1600);
            asset.height = Some(1066);
            asset.alt = Some(row.alt.to_string());
            asset
        })
        .collect();

    let files = FILE_ROWS
        .iter()
        .map(|(id, title, file, folder, tags)| {
            let path = format!("/images/demo/{file}");
            FileRecord {
                id: id.to_string(),
                title: Some(title.to_string()),
                filename: Some(file.to_string()),
                src: Some(path.clone()),
                thumb: Some(path),
                folder_name: Some(folder.to_string()),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..FileRecord::default()
            }
        })
        .collect();

    Catalog { stock, files }
});

impl Catalog {
    /// The built-in demo catalog.
    pub fn demo() -> &'static Catalog {
        &DEMO
    }

    /// Loads a catalog from a JSON file of the shape `{"stock": [...], "files": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        info!(
            path = %path.display(),
            stock = catalog.stock.len(),
            files = catalog.files.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Loads `path` when given, otherwise clones the demo catalog.
    pub fn load_or_demo(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::demo().clone()),
        }
    }

    /// Stock assets carrying any of `tags`, in catalog order.
    pub fn picks_by_tags(&self, tags: &[&str], limit: usize) -> Vec<&Asset> {
        self.stock
            .iter()
            .filter(|a| a.tags.iter().any(|t| tags.contains(&t.as_str())))
            .take(limit)
            .collect()
    }

    /// Stock assets with people in them, in catalog order.
    pub fn picks_with_people(&self, limit: usize) -> Vec<&Asset> {
        self.stock.iter().filter(|a| a.has_people).take(limit).collect()
    }

    /// Puts freshly ingested assets ahead of the existing stock.
    pub fn prepend_uploads(&mut self, uploads: Vec<Asset>) {
        let existing = std::mem::take(&mut self.stock);
        self.stock = uploads;
        self.stock.extend(existing);
    }
}
