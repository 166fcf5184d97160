//! Error types for docent-core

use thiserror::Error;

/// Result type alias using docent-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a chat view
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend client
    #[error(transparent)]
    Api(#[from] docent_api::Error),
}
