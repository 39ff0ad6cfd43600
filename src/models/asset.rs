use serde::{Deserialize, Serialize};

/// Broad media category derived from a mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Vector,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "image/svg+xml" {
            Self::Vector
        } else if mime.starts_with("image/") {
            Self::Photo
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Other
        }
    }

    /// Mime type for a file extension, for assets that arrive as plain files.
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            "gif" => Some("image/gif"),
            "bmp" => Some("image/bmp"),
            "tiff" | "tif" => Some("image/tiff"),
            "svg" => Some("image/svg+xml"),
            "mp4" => Some("video/mp4"),
            "webm" => Some("video/webm"),
            "mov" => Some("video/quicktime"),
            _ => None,
        }
    }
}

fn default_mime() -> String {
    "image/jpeg".to_string()
}

/// One browsable asset as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_mime")]
    pub mime: String,
    #[serde(default)]
    pub has_people: bool,
    #[serde(default)]
    pub dominant_color: Option<String>,
    /// Declared pixel width; advisory until the asset is decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Explicit aspect ratio (w/h), preferred over width/height when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

impl Asset {
    /// Create an asset with just the fields needed for display.
    pub fn new(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            title: String::new(),
            tags: Vec::new(),
            mime: default_mime(),
            has_people: false,
            dominant_color: None,
            width: None,
            height: None,
            ratio: None,
            alt: None,
            folder: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime)
    }

    /// Title for display: title, then alt text, then id.
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if let Some(alt) = self.alt.as_deref().filter(|a| !a.is_empty()) {
            alt
        } else {
            &self.id
        }
    }

    /// Dominant color with surrounding whitespace removed; blank counts as none.
    pub fn color(&self) -> Option<&str> {
        self.dominant_color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("image/jpeg"), MediaKind::Photo);
        assert_eq!(MediaKind::from_mime("IMAGE/PNG"), MediaKind::Photo);
        assert_eq!(MediaKind::from_mime("image/svg+xml"), MediaKind::Vector);
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Other);
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(MediaKind::mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(MediaKind::mime_for_extension("png"), Some("image/png"));
        assert_eq!(MediaKind::mime_for_extension("txt"), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r##"{"id":"st-001","src":"a.jpg","dominant_color":" #3a5a44 "}"##;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert_eq!(asset.mime, "image/jpeg");
        assert!(!asset.has_people);
        assert!(asset.tags.is_empty());
        assert_eq!(asset.color(), Some("#3a5a44"));
        assert_eq!(asset.display_title(), "st-001");
    }

    #[test]
    fn test_blank_color_is_none() {
        let mut asset = Asset::new("a", "a.jpg");
        asset.dominant_color = Some("   ".into());
        assert_eq!(asset.color(), None);
    }
}
