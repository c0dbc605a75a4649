//! Error types for fragment-ids operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, fragmenting or writing a work.
///
/// A header field whose pattern does not match is deliberately absent: that
/// case is logged and reported, and the field is skipped.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{document}: content region `{selector}` not found")]
    MissingContentRegion { document: String, selector: String },

    #[error(
        "{document}: header fields requested but metadata region `{selector}` not found \
         (is a title page missing? disable header fields to skip them)"
    )]
    MissingMetadataRegion { document: String, selector: String },

    #[error("{document}: missing required element: {what}")]
    MissingElement { document: String, what: String },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("identifier requested beyond the counted total of {total}")]
    IdOverflow { total: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
