//! Error types for the Deezer gw-light API client.

use thiserror::Error;

/// Errors that can occur when interacting with the Deezer API.
#[derive(Debug, Error)]
pub enum DeezerError {
    /// Bad local configuration (missing or malformed credential, bad track
    /// reference). Raised before any network activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// The handshake or a token refresh was rejected. The arl credential is
    /// invalid or expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The track id did not resolve to any track.
    #[error("track not found: {0}")]
    TrackNotFound(u64),

    /// The service reports the track as unavailable for this account's
    /// region or tier.
    #[error("track not streamable: {0}")]
    Rights(String),

    /// Every source strategy failed, including the preview fallback.
    #[error("no usable source URL for this track")]
    Resolution,

    /// HTTP transport error (connection refused, timeout, TLS failure, etc.).
    /// Transient when it hits a single candidate URL; the strategy chain
    /// recovers by advancing.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error payload for a non-token reason.
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse a JSON response from the API.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeezerError {
    /// Suggested remedy for terminal errors, shown to the user alongside
    /// the error message.
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => {
                Some("set DEEZER_ARL_TOKEN to your arl cookie value (run `dzdump token` for a walkthrough)")
            }
            Self::Auth(_) => {
                Some("refresh your arl credential from a logged-in browser session (run `dzdump token`)")
            }
            Self::TrackNotFound(_) => Some("check the track id or URL"),
            Self::Rights(_) => {
                Some("the track is region- or tier-locked for this account; try another track")
            }
            Self::Resolution => Some("the delivery endpoints may be rotating; retry later"),
            _ => None,
        }
    }
}

/// Convenience alias for `Result<T, DeezerError>`.
pub type Result<T> = std::result::Result<T, DeezerError>;
