//! Inbound webhook verification and the HTTP endpoint.
//!
//! A callback passes through a fixed pipeline: signature and timestamp
//! check, JSON parse, envelope-shape classification, verification-token
//! check, then dispatch. Any failure short-circuits into an error
//! response; nothing is retried.

pub mod endpoint;
pub mod envelope;
pub mod signature;

pub use endpoint::{router, AppState};
pub use envelope::{EventHeader, WebhookEnvelope};

/// Header carrying the hex-encoded request signature.
pub const SIGNATURE_HEADER: &str = "x-lark-signature";

/// Header carrying the unix-seconds timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "x-lark-request-timestamp";

/// Header carrying the platform-assigned request identifier.
pub const REQUEST_ID_HEADER: &str = "x-lark-request-id";

/// A malformed or unauthenticated inbound request.
///
/// Every variant maps to an HTTP 400 at the endpoint; the display string
/// becomes the response `msg`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One of the signature/timestamp/request-id headers is absent.
    #[error("missing headers")]
    MissingHeaders,

    /// The timestamp is outside the replay window (or unparsable).
    #[error("stale timestamp")]
    StaleTimestamp,

    /// The computed digest does not match the supplied signature.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The body is not valid JSON.
    #[error("invalid JSON body")]
    InvalidJson,

    /// The body matches neither the challenge nor the callback shape.
    #[error("unknown event type")]
    UnknownEventShape,

    /// The embedded verification token does not match the configured one.
    #[error("token mismatch")]
    TokenMismatch,

    /// No verification token is present in the envelope.
    #[error("missing token")]
    MissingToken,
}
