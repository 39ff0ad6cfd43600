//! Upload ingestion.
//!
//! A directory of image files stands in for a drag-and-drop upload: each file
//! becomes an `Asset` with placeholder metadata, then its dominant color is
//! extracted in the background.

pub mod header;
pub mod uploader;

pub use header::read_dimensions;
pub use uploader::{IngestProgress, IngestReport, Ingestor};
