use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Price history could not be obtained or was not a well-formed bar array.
    #[error("Price history unavailable: {0}")]
    DataUnavailable(String),

    #[error("Direction store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
