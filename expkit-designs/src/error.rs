use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid design base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("design base url {0} cannot hold a path")]
    NotABase(String),
}
