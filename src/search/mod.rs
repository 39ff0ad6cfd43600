//! Command palette search over stock assets and file records.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, FileRecord};
use crate::models::Asset;

/// Maximum number of results shown in the palette.
pub const MAX_RESULTS: usize = 30;

/// Characters left alone by URI component encoding.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Stock,
    Files,
}

/// Which sections a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionScope {
    #[default]
    All,
    Stock,
    Files,
}

impl SectionScope {
    fn includes(self, section: Section) -> bool {
        matches!(
            (self, section),
            (Self::All, _) | (Self::Stock, Section::Stock) | (Self::Files, Section::Files)
        )
    }
}

impl FromStr for SectionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "stock" => Ok(Self::Stock),
            "files" => Ok(Self::Files),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stock => "stock",
            Self::Files => "files",
        })
    }
}

/// One palette entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub section: Section,
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    pub badges: Vec<String>,
}

fn stock_result(asset: &Asset) -> SearchResult {
    SearchResult {
        id: asset.id.clone(),
        title: asset.display_title().to_string(),
        section: Section::Stock,
        href: format!("/stock/{}", asset.id),
        thumb: Some(asset.src.clone()).filter(|s| !s.is_empty()),
        badges: asset.tags.iter().take(2).cloned().collect(),
    }
}

fn file_result(record: &FileRecord) -> SearchResult {
    SearchResult {
        id: record.id.clone(),
        title: record.display_title().to_string(),
        section: Section::Files,
        href: format!("/files?select={}", utf8_percent_encode(&record.id, COMPONENT)),
        thumb: record.thumb.clone().or_else(|| record.src.clone()),
        badges: record.folder_name.iter().filter(|f| !f.is_empty()).cloned().collect(),
    }
}

fn stock_haystack(asset: &Asset) -> String {
    let mut text = format!("{} {}", asset.id, asset.display_title());
    for tag in &asset.tags {
        text.push(' ');
        text.push_str(tag);
    }
    text.to_lowercase()
}

fn file_haystack(record: &FileRecord) -> String {
    let mut text = format!("{} {}", record.id, record.display_title());
    for part in [&record.folder_name, &record.folder_id].into_iter().flatten() {
        text.push(' ');
        text.push_str(part);
    }
    for tag in &record.tags {
        text.push(' ');
        text.push_str(tag);
    }
    text.to_lowercase()
}

fn rank(title: &str, query: &str) -> u8 {
    if query.is_empty() {
        return 3;
    }
    let title = title.to_lowercase();
    if title.starts_with(query) {
        0
    } else if title.contains(query) {
        1
    } else {
        2
    }
}

/// Searches both collections, best title matches first.
///
/// Stock records come before file records within a rank. An empty query
/// lists everything in catalog order.
pub fn search(catalog: &Catalog, query: &str, scope: SectionScope) -> Vec<SearchResult> {
    let query = query.trim().to_lowercase();
    let mut found: Vec<(u8, SearchResult)> = Vec::new();

    if scope.includes(Section::Stock) {
        for asset in &catalog.stock {
            if query.is_empty() || stock_haystack(asset).contains(&query) {
                let result = stock_result(asset);
                found.push((rank(&result.title, &query), result));
            }
        }
    }
    if scope.includes(Section::Files) {
        for record in &catalog.files {
            if query.is_empty() || file_haystack(record).contains(&query) {
                let result = file_result(record);
                found.push((rank(&result.title, &query), result));
            }
        }
    }

    found.sort_by_key(|(r, _)| *r);
    found.into_iter().take(MAX_RESULTS).map(|(_, r)| r).collect()
}
