use shared::error::ErrorBody;
use thiserror::Error;

/// Client-side failure taxonomy. Every variant is recoverable: state stays at
/// the pre-failure point and the caller decides when to retry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed, or the response body was unreadable.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status. `message` carries the
    /// structured payload's text verbatim when one was present.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    /// A client-side guard failed; no network call was made.
    #[error("{0}")]
    Precondition(String),
    /// The durable session store misbehaved.
    #[error("session store failure: {0}")]
    Store(#[source] anyhow::Error),
}

impl ClientError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

/// Resolves a response per the failure contract: success passes through;
/// non-success yields the server's structured `{"error": …}` message when one
/// is present, otherwise `fallback`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) if !body.error.trim().is_empty() => body.error,
        _ => fallback.to_string(),
    };
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}
