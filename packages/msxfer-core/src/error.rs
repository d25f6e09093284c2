//! Error types shared by the msxfer server and client crates.

use thiserror::Error;

/// Result type alias for msxfer-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the transfer registry and codec adapter.
#[derive(Error, Debug)]
pub enum Error {
    /// A `create` call used a transfer id that already has a record.
    #[error("transfer id already in use: {0}")]
    Conflict(String),

    /// No record exists for the given transfer id.
    #[error("unknown transfer id: {0}")]
    NotFound(String),

    /// A filesystem operation on a staged or final artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The codec adapter could not classify or convert a file.
    #[error("codec error: {0}")]
    Codec(String),
}
