//! Error types for the fallible parts of the crate
//!
//! The substitution core never fails: a fragment that cannot be matched is
//! simply left alone. Errors only arise around it, when loading configuration,
//! persisting the fragment store, crawling content or talking to a machine
//! translation provider.

use crate::mt::MtError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or writing a file failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A store operation referenced something that does not exist
    #[error("Store error: {0}")]
    Store(String),

    /// A content page could not be fetched during a crawl
    #[error("Fetch error for '{url}': {message}")]
    Fetch { url: String, message: String },

    /// Machine translation failed
    #[error(transparent)]
    Mt(#[from] MtError),
}

impl Error {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
