//! Error types for tars-agent

use thiserror::Error;

/// Result type alias using tars-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a query. Everything recoverable is folded into history instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The model gateway failed
    #[error(transparent)]
    Gateway(#[from] tars_ai::Error),
}

impl Error {
    /// Credential problems terminate the session
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Gateway(e) => e.is_auth(),
        }
    }
}
