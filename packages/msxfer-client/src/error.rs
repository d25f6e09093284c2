//! Client-side error kinds: input resolution, protocol, and polling
//! timeouts are distinguished so a batch driver can attach the right
//! message to each `FileResult`.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no eligible inputs found")]
    NoEligibleInputs,

    #[error("request failed: {0}")]
    Protocol(#[from] reqwest::Error),

    #[error("server returned {status}: {detail}")]
    ServerError {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("no progress observed for the configured timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] msxfer_core::Error),
}
