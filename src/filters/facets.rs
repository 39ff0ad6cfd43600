//! Faceted filtering of the asset list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::color_filter::{filter_by_color_cached, DEFAULT_TOLERANCE};
use crate::color::LabCache;
use crate::models::{Asset, MediaKind};

/// Media type checkbox in the filter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFacet {
    Photo,
    Vector,
    Video,
}

impl TypeFacet {
    fn matches(self, kind: MediaKind) -> bool {
        matches!(
            (self, kind),
            (Self::Photo, MediaKind::Photo)
                | (Self::Vector, MediaKind::Vector)
                | (Self::Video, MediaKind::Video)
        )
    }
}

impl FromStr for TypeFacet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" | "photos" => Ok(Self::Photo),
            "vector" | "vectors" => Ok(Self::Vector),
            "video" | "videos" => Ok(Self::Video),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// People radio group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeopleFacet {
    #[default]
    Any,
    #[serde(rename = "has")]
    With,
    #[serde(rename = "none")]
    Without,
}

impl FromStr for PeopleFacet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "has" | "with" => Ok(Self::With),
            "none" | "without" => Ok(Self::Without),
            other => Err(format!("unknown people filter: {other}")),
        }
    }
}

/// Top-level tab of the stock browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Universe {
    Photos,
    Vectors,
    Videos,
}

impl Universe {
    fn admits(self, kind: MediaKind) -> bool {
        match self {
            Self::Photos => kind == MediaKind::Photo,
            Self::Vectors => kind == MediaKind::Vector,
            Self::Videos => kind == MediaKind::Video,
        }
    }
}

impl FromStr for Universe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photos" | "photo" => Ok(Self::Photos),
            "vectors" | "vector" => Ok(Self::Vectors),
            "videos" | "video" => Ok(Self::Videos),
            other => Err(format!("unknown universe: {other}")),
        }
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Photos => "photos",
            Self::Vectors => "vectors",
            Self::Videos => "videos",
        })
    }
}

/// Folder selection on the files page. `"all"` is the same as no folder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderFilter {
    #[default]
    All,
    Folder(String),
}

impl FolderFilter {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Folder(s.to_string())
        }
    }

    fn admits(&self, asset: &Asset) -> bool {
        match self {
            Self::All => true,
            Self::Folder(id) => asset.folder.as_deref() == Some(id.as_str()),
        }
    }
}

/// Filter panel state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub types: Vec<TypeFacet>,
    pub people: PeopleFacet,
    pub color_hex: Option<String>,
    pub color_tolerance: Option<f64>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            people: PeopleFacet::Any,
            color_hex: None,
            color_tolerance: Some(DEFAULT_TOLERANCE),
        }
    }
}

impl FilterState {
    /// Number of active facets, shown as a badge on the filter button.
    pub fn active_count(&self) -> usize {
        let mut n = usize::from(!self.types.is_empty());
        if self.people != PeopleFacet::Any {
            n += 1;
        }
        if self.color().is_some() {
            n += 1;
        }
        n
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Toggles a type checkbox.
    pub fn toggle_type(&mut self, facet: TypeFacet) {
        if let Some(pos) = self.types.iter().position(|t| *t == facet) {
            self.types.remove(pos);
        } else {
            self.types.push(facet);
        }
    }

    fn color(&self) -> Option<&str> {
        self.color_hex.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn tolerance(&self) -> f64 {
        self.color_tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }
}

/// Everything that narrows the visible asset list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub text: String,
    pub universe: Option<Universe>,
    pub folder: FolderFilter,
    pub filters: FilterState,
}

impl Query {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

fn matches_text(asset: &Asset, needle: &str) -> bool {
    asset.title.to_lowercase().contains(needle)
        || asset.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Runs the filter pipeline: universe and folder, text, type, people, then
/// color.
///
/// The color step reorders survivors nearest first; every other step keeps
/// input order. A malformed target color skips the color step.
pub fn apply<'a>(assets: &'a [Asset], query: &Query, labs: &LabCache) -> Vec<&'a Asset> {
    let needle = query.text.trim().to_lowercase();
    let state = &query.filters;

    let rows: Vec<&Asset> = assets
        .iter()
        .filter(|a| query.universe.map_or(true, |u| u.admits(a.kind())))
        .filter(|a| query.folder.admits(a))
        .filter(|a| needle.is_empty() || matches_text(a, &needle))
        .filter(|a| state.types.is_empty() || state.types.iter().any(|t| t.matches(a.kind())))
        .filter(|a| match state.people {
            PeopleFacet::Any => true,
            PeopleFacet::With => a.has_people,
            PeopleFacet::Without => !a.has_people,
        })
        .collect();

    let Some(target) = state.color() else {
        debug!(count = rows.len(), "Filtered assets");
        return rows;
    };

    match filter_by_color_cached(&rows, target, state.tolerance(), labs) {
        Ok(kept) => {
            debug!(count = kept.len(), color = target, "Filtered assets by color");
            kept.into_iter().copied().collect()
        }
        Err(e) => {
            warn!(error = %e, "Ignoring color filter");
            rows
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(
        id: &str,
        title: &str,
        tags: &[&str],
        mime: &str,
        people: bool,
        color: Option<&str>,
    ) -> Asset {
        let mut a = Asset::new(id, format!("{id}.jpg"));
        a.title = title.to_string();
        a.tags = tags.iter().map(|t| t.to_string()).collect();
        a.mime = mime.to_string();
        a.has_people = people;
        a.dominant_color = color.map(str::to_string);
        a
    }

    const JPEG: &str = "image/jpeg";
    const SVG: &str = "image/svg+xml";

    fn fixture() -> Vec<Asset> {
        vec![
            asset("st-001", "Forest trail", &["forest", "green"], JPEG, false, Some("#2e5b3c")),
            asset("st-002", "City crowd", &["urban", "people"], JPEG, true, Some("#4b5b6a")),
            asset("st-003", "Leaf icon", &["icon", "green"], SVG, false, Some("#3a5a44")),
            asset("st-004", "Surf clip", &["ocean"], "video/mp4", true, Some("#3a86ff")),
            asset("st-005", "Moss macro", &["Forest"], "image/png", false, None),
        ]
    }

    fn ids<'a>(rows: &[&'a Asset]) -> Vec<&'a str> {
        rows.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let assets = fixture();
        let rows = apply(&assets, &Query::default(), &LabCache::new());
        assert_eq!(rows.len(), assets.len());
    }

    #[test]
    fn test_text_matches_title_or_tags() {
        let assets = fixture();
        let rows = apply(&assets, &Query::text("FOREST"), &LabCache::new());
        assert_eq!(ids(&rows), vec!["st-001", "st-005"]);

        let rows = apply(&assets, &Query::text("crowd"), &LabCache::new());
        assert_eq!(ids(&rows), vec!["st-002"]);
    }

    #[test]
    fn test_universe_and_types() {
        let assets = fixture();
        let mut query = Query::default();
        query.universe = Some(Universe::Photos);
        let rows = apply(&assets, &query, &LabCache::new());
        assert_eq!(ids(&rows), vec!["st-001", "st-002", "st-005"]);

        let mut query = Query::default();
        query.filters.types = vec![TypeFacet::Vector, TypeFacet::Video];
        assert_eq!(ids(&apply(&assets, &query, &LabCache::new())), vec!["st-003", "st-004"]);
    }

    #[test]
    fn test_people_facet() {
        let assets = fixture();
        let mut query = Query::default();
        query.filters.people = PeopleFacet::With;
        assert_eq!(ids(&apply(&assets, &query, &LabCache::new())), vec!["st-002", "st-004"]);

        query.filters.people = PeopleFacet::Without;
        let rows = apply(&assets, &query, &LabCache::new());
        assert_eq!(ids(&rows), vec!["st-001", "st-003", "st-005"]);
    }

    #[test]
    fn test_folder_filter() {
        let mut assets = fixture();
        assets[1].folder = Some("f-team".into());
        assets[3].folder = Some("f-team".into());

        let mut query = Query::default();
        query.folder = FolderFilter::parse("f-team");
        assert_eq!(ids(&apply(&assets, &query, &LabCache::new())), vec!["st-002", "st-004"]);

        query.folder = FolderFilter::parse("ALL");
        assert_eq!(apply(&assets, &query, &LabCache::new()).len(), assets.len());
    }

    #[test]
    fn test_color_step_runs_last_and_reorders() {
        let assets = fixture();
        let mut query = Query::text("green");
        query.filters.color_hex = Some("#3a5a44".into());
        query.filters.color_tolerance = Some(15.0);
        assert_eq!(ids(&apply(&assets, &query, &LabCache::new())), vec!["st-003", "st-001"]);
    }

    #[test]
    fn test_invalid_color_leaves_list_unfiltered() {
        let assets = fixture();
        let mut query = Query::default();
        query.filters.color_hex = Some("#zzz".into());
        assert_eq!(apply(&assets, &query, &LabCache::new()).len(), assets.len());
    }

    #[test]
    fn test_active_count_and_reset() {
        let mut state = FilterState::default();
        assert!(!state.is_active());

        state.toggle_type(TypeFacet::Photo);
        state.toggle_type(TypeFacet::Video);
        state.people = PeopleFacet::Without;
        state.color_hex = Some("#ff0000".into());
        assert_eq!(state.active_count(), 3);

        state.toggle_type(TypeFacet::Photo);
        assert_eq!(state.types, vec![TypeFacet::Video]);

        state.color_hex = Some("   ".into());
        assert_eq!(state.active_count(), 2);

        state.reset();
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn test_types_count_once() {
        let mut state = FilterState::default();
        state.toggle_type(TypeFacet::Photo);
        assert_eq!(state.active_count(), 1);
        state.toggle_type(TypeFacet::Video);
        state.toggle_type(TypeFacet::Vector);
        assert_eq!(state.active_count(), 1);
    }

    #[test]
    fn test_parse_facets() {
        assert_eq!("Photos".parse::<TypeFacet>(), Ok(TypeFacet::Photo));
        assert_eq!("has".parse::<PeopleFacet>(), Ok(PeopleFacet::With));
        assert_eq!("vectors".parse::<Universe>(), Ok(Universe::Vectors));
        assert!("audio".parse::<TypeFacet>().is_err());
    }
}
