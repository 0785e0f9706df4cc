use subfinder_store::StoreError;
use thiserror::Error;

/// All the ways things can go wrong while finding substitutes
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(String),

    /// A downloaded record we can't turn into a product
    #[error("Malformed record {}: {reason}", .code.as_deref().unwrap_or("<no code>"))]
    MalformedRecord {
        code: Option<String>,
        reason: String,
    },

    /// Network trouble while fetching a page of products
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    #[error("Catalog store error: {0}")]
    StoreError(#[source] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("No user identified. Pass --user or set SUBFINDER_USER")]
    Unauthenticated,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => Error::NotFound(id.to_string()),
            other => Error::StoreError(other),
        }
    }
}

impl Error {
    pub(crate) fn malformed(code: Option<&str>, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            code: code.map(str::to_string),
            reason: reason.into(),
        }
    }
}
