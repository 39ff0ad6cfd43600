//! Narrowing the visible asset list.
//!
//! - `color_filter` - ΔE tolerance filter with nearest-first ordering
//! - `facets` - type, people, folder and text facets, and the pipeline that
//!   combines them

pub mod color_filter;
pub mod facets;

pub use color_filter::{
    clamp_tolerance, filter_by_color, filter_by_color_cached, rank_by_color, Colored,
    DEFAULT_TOLERANCE,
};
pub use facets::{apply, FilterState, FolderFilter, PeopleFacet, Query, TypeFacet, Universe};
