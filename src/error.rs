//! Error taxonomy for the streaming chat core.

use thiserror::Error;

/// Errors surfaced by a chat session.
///
/// Every variant is terminal for the submission that produced it; the session
/// records it in its error slot and leaves the transcript rolled back to the
/// last committed turn. Individual stream frames that fail to parse are *not*
/// errors: they are skipped and the stream continues.
///
/// Payloads are plain strings and status codes so errors stay `Clone` and can
/// live in the session's error slot while also being returned to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// A required credential is missing. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-success HTTP status, or a response without an event-stream body.
    /// Carries the status code and the raw body text.
    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Any other failure while sending the request or consuming the body,
    /// such as a network interruption or a decoder failure.
    #[error("stream error: {0}")]
    Stream(String),
}
