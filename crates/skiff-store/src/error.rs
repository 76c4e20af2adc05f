//! Error types for object-store operations.

/// Errors that can occur during object-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP transport failed (connection, TLS, body read).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Computing the request signature failed.
    #[error("request signing error: {0}")]
    Signing(String),

    /// The remote answered with a status outside the per-verb whitelist.
    #[error("unexpected response from {verb} '{url}': status {status}{detail}")]
    UnexpectedStatus {
        /// HTTP verb of the failed request.
        verb: &'static str,
        /// Full request URL (names the offending key).
        url: String,
        /// The offending status code.
        status: u16,
        /// Pre-formatted body snippet, empty when no body was read.
        detail: String,
    },
}
