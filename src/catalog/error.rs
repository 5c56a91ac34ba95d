use thiserror::Error;

/// Failures talking to the catalog. The `Display` text is shown to the user.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not read the catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("the catalog rejected the request (status {status:?})")]
    Rejected { status: String },
}
