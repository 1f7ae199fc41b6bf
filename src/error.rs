use reqwest::StatusCode;
use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

/// Everything that can go wrong while resolving a contest, fetching a task
/// page or writing its samples.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },
    #[error("failed to parse html: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to write {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
