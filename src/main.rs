use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};

use stockgrid::catalog::Catalog;
use stockgrid::color::{delta_e, LabCache};
use stockgrid::config::Config;
use stockgrid::filters::{apply, FilterState, FolderFilter, PeopleFacet, Query, TypeFacet, Universe};
use stockgrid::ingest::{IngestProgress, Ingestor};
use stockgrid::layout::{CachedLayoutComputer, JustifiedLayout, RatioCache};
use stockgrid::models::{GalleryItem, Row};
use stockgrid::palette::{ExtractionRequest, PaletteQueue};
use stockgrid::search::{search, SectionScope};

#[derive(Parser)]
#[command(name = "stockgrid")]
#[command(about = "Justified image grid with perceptual color search")]
struct Cli {
    /// Config file (default: <config dir>/stockgrid/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out the filtered assets in justified rows
    Layout {
        #[command(flatten)]
        filter: FilterArgs,

        /// Container width in pixels; repeat for several widths
        #[arg(short, long, required = true, num_args = 1..)]
        width: Vec<u32>,

        /// Target row height in pixels
        #[arg(long)]
        row_height: Option<f64>,

        /// Minimum row height in pixels
        #[arg(long)]
        min_row_height: Option<f64>,

        /// Gap between items and rows in pixels
        #[arg(long)]
        gap: Option<u32>,
    },
    /// List the assets that survive the filters
    Filter {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the dominant color of image files
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Command palette search over stock and files
    Search {
        #[arg(default_value = "")]
        query: String,

        /// Section to search: all, stock or files
        #[arg(long, default_value = "all")]
        section: SectionScope,

        /// Catalog JSON file (default: built-in demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Turn a directory of images into assets
    Ingest {
        dir: PathBuf,

        /// Folder the uploads are placed in
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Catalog JSON file (default: built-in demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Text matched against titles and tags
    #[arg(short, long, default_value = "")]
    query: String,

    /// photos, vectors or videos
    #[arg(long)]
    universe: Option<Universe>,

    /// Folder id, or "all"
    #[arg(long, default_value = "all")]
    folder: String,

    /// Media type facet (photo, vector, video); repeatable
    #[arg(short = 't', long = "type")]
    types: Vec<TypeFacet>,

    /// any, has or none
    #[arg(long, default_value = "any")]
    people: PeopleFacet,

    /// Target color as #rgb or #rrggbb
    #[arg(short, long)]
    color: Option<String>,

    /// ΔE tolerance, 0 to 100
    #[arg(long)]
    tolerance: Option<f64>,
}

impl FilterArgs {
    fn query(&self, config: &Config) -> Query {
        Query {
            text: self.query.clone(),
            universe: self.universe,
            folder: FolderFilter::parse(&self.folder),
            filters: FilterState {
                types: self.types.clone(),
                people: self.people,
                color_hex: self.color.clone(),
                color_tolerance: Some(self.tolerance.unwrap_or(config.filters.default_tolerance)),
            },
        }
    }
}

#[derive(Serialize)]
struct LayoutOutput<'a> {
    width: u32,
    total_height: u32,
    rows: &'a [Row],
}

#[derive(Serialize)]
struct FilterHit<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta_e: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockgrid=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Layout {
            filter,
            width,
            row_height,
            min_row_height,
            gap,
        } => {
            let mut layout = config.layout.layout();
            if let Some(h) = row_height {
                layout.target_row_height = h;
            }
            if let Some(h) = min_row_height {
                layout.min_row_height = h;
            }
            if let Some(g) = gap {
                layout.gap = g;
            }
            run_layout(&config, &filter, layout, &width)
        }
        Commands::Filter { filter } => run_filter(&config, &filter),
        Commands::Extract { files } => run_extract(&config, &files),
        Commands::Search {
            query,
            section,
            catalog,
        } => {
            let catalog = Catalog::load_or_demo(catalog.as_deref())?;
            print_json(&search(&catalog, &query, section))
        }
        Commands::Ingest { dir, folder } => run_ingest(&config, dir, folder).await,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_layout(
    config: &Config,
    args: &FilterArgs,
    layout: JustifiedLayout,
    widths: &[u32],
) -> Result<()> {
    let catalog = Catalog::load_or_demo(args.catalog.as_deref())?;
    let labs = LabCache::new();
    let visible = apply(&catalog.stock, &args.query(config), &labs);

    let ratios = RatioCache::new();
    let items = GalleryItem::from_assets(visible, &ratios);
    let computer = CachedLayoutComputer::with_layout(layout);

    let laid_out: Vec<(u32, Vec<Row>)> = widths
        .iter()
        .map(|&w| (w, computer.compute(&items, w)))
        .collect();
    let output: Vec<LayoutOutput> = laid_out
        .iter()
        .map(|(width, rows)| LayoutOutput {
            width: *width,
            total_height: computer.layout.total_height(rows),
            rows,
        })
        .collect();

    info!(items = items.len(), widths = widths.len(), "Computed layout");
    print_json(&output)
}

fn run_filter(config: &Config, args: &FilterArgs) -> Result<()> {
    let catalog = Catalog::load_or_demo(args.catalog.as_deref())?;
    let labs = LabCache::new();
    let query = args.query(config);
    let visible = apply(&catalog.stock, &query, &labs);

    let target = query
        .filters
        .color_hex
        .as_deref()
        .and_then(|hex| labs.lab(hex).ok());

    let hits: Vec<FilterHit> = visible
        .iter()
        .map(|asset| FilterHit {
            id: &asset.id,
            title: asset.display_title(),
            color: asset.color(),
            delta_e: target.and_then(|t| {
                let lab = labs.lab(asset.color()?).ok()?;
                Some((delta_e(t, lab) * 100.0).round() / 100.0)
            }),
        })
        .collect();

    print_json(&hits)
}

fn run_extract(config: &Config, files: &[PathBuf]) -> Result<()> {
    let queue = PaletteQueue::new(config.palette.workers, config.palette.options())
        .context("Failed to start palette workers")?;

    let ids: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    let accepted = queue.request_batch(
        ids.iter()
            .zip(files)
            .map(|(id, path)| ExtractionRequest::from_path(id.clone(), path.clone()))
            .collect(),
    );
    debug!(accepted, requested = files.len(), "Queued extractions");

    let mut colors: HashMap<String, Option<String>> = HashMap::new();
    for _ in 0..accepted {
        match queue.wait_result(config.palette.timeout()) {
            Some(result) => {
                colors.insert(result.id, result.hex);
            }
            None => {
                warn!("Timed out waiting for extraction");
                break;
            }
        }
    }

    for id in &ids {
        let hex = colors.get(id).cloned().flatten();
        println!("{}\t{}", id, hex.as_deref().unwrap_or("-"));
    }
    Ok(())
}

async fn run_ingest(config: &Config, dir: PathBuf, folder: Option<String>) -> Result<()> {
    let ingestor = Ingestor::new(config.ingest.clone(), config.palette.clone()).with_folder(folder);
    let (mut rx, handle) = ingestor.ingest_with_progress(dir);

    while let Some(event) = rx.recv().await {
        match event {
            IngestProgress::FileError { path, error } => {
                warn!(path = %path.display(), %error, "Upload skipped")
            }
            IngestProgress::ColorResolved { id, hex } => debug!(%id, ?hex, "Color resolved"),
            other => debug!(?other, "Ingest progress"),
        }
    }

    let report = handle.await.context("Ingest task failed")??;
    print_json(&report.assets)
}
