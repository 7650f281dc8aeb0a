use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {0} from {1}")]
    UnexpectedStatus(u16, String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}
