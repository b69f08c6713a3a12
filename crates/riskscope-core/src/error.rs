use thiserror::Error;

/// Failures surfaced by the external-service clients and the config loader.
///
/// Engine-level batch paths absorb these per item (a failed lookup degrades
/// to an empty result); callers that talk to a client directly get the
/// classified error.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Api { service: &'static str, status: u16 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
