use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed URL or arguments; raised before any network call.
    #[error("{0}")]
    Usage(String),

    /// Missing cookie file, or the API answered with HTML where JSON was
    /// expected (stale or missing session).
    #[error("{0}")]
    Auth(String),

    /// Bad status, malformed JSON, or a problem absent from the API response.
    #[error("{0}")]
    Upstream(String),

    /// A single attachment failed to download. Recorded per link inside the
    /// owning fetch, never fatal to it.
    #[error("download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// A required external helper (e.g. the editor CLI) is not on this host.
    #[error("{0}")]
    Environment(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
