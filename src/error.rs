// Error taxonomy for the supplier protocol stack

use thiserror::Error;

/// Failures surfaced by the protocol client, session manager and gateway.
///
/// Every remote failure maps to exactly one variant; nothing is swallowed.
/// Retrying (e.g. after a token refresh on `Auth`) is a caller-level policy.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("operation forbidden: {0}")]
    Forbidden(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("transport failure in {operation} ({status}): {body}")]
    Transport {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("supplier fault: {0}")]
    Fault(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("missing field in response: {0}")]
    MissingField(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

impl ProtocolError {
    /// Classify a non-success HTTP status, keeping the raw body around so a
    /// failed call can be reproduced from the error alone.
    pub fn from_status(operation: &str, status: u16, body: String) -> Self {
        match status {
            401 => ProtocolError::Auth(format!("{operation} returned 401, check credentials")),
            403 => ProtocolError::Forbidden(format!(
                "{operation} returned 403, credentials valid but access denied"
            )),
            404 => ProtocolError::NotFound(format!("{operation} returned 404")),
            400 => ProtocolError::BadRequest(format!("{operation} returned 400: {body}")),
            _ => ProtocolError::Transport {
                operation: operation.to_string(),
                status,
                body,
            },
        }
    }
}
