use thiserror::Error;

/// Errors produced while parsing color strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// The input is not a 3- or 6-digit hexadecimal color (with optional `#`).
    #[error("invalid color format: {input:?} (expected #rgb or #rrggbb)")]
    InvalidColorFormat { input: String },
}

impl ColorError {
    pub(crate) fn invalid(input: &str) -> Self {
        ColorError::InvalidColorFormat {
            input: input.to_string(),
        }
    }
}
