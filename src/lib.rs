//! Justified image grid with perceptual color search.
//!
//! - `layout` - greedy row packing that fills the container width
//! - `color` - hex parsing, CIELAB conversion and ΔE
//! - `filters` - color tolerance filter and the facet pipeline
//! - `palette` - dominant color extraction and its worker queue
//! - `search` - command palette ranking over stock and files
//! - `catalog` - the stock and file collections
//! - `ingest` - turning a directory of images into assets
//! - `config` - YAML configuration

pub mod catalog;
pub mod color;
pub mod config;
pub mod filters;
pub mod ingest;
pub mod layout;
pub mod models;
pub mod palette;
pub mod search;
