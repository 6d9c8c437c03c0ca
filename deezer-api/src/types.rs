//! Data types for Deezer gw-light API responses.
//!
//! These types are filled from the raw JSON returned by the gw-light
//! endpoints. Field names follow Rust conventions (`snake_case`) rather
//! than the original API naming (`SCREAMING_CASE`).

use serde::{Deserialize, Serialize};

/// A music track, as returned by
/// [`DeezerClient::track_details`](crate::DeezerClient::track_details).
///
/// API JSON fields: `SNG_ID`, `SNG_TITLE`, `ART_NAME`, `DURATION`,
/// `FILESIZE_MP3_*`, `RIGHTS`, `TRACK_TOKEN`, `MD5_ORIGIN`,
/// `MEDIA_VERSION`, `MEDIA` (preview entries).
///
/// Fetched exactly once per run and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Numeric track id.
    pub id: u64,
    /// Song title.
    pub title: String,
    /// Main artist display name.
    pub artist: String,
    /// Duration in seconds.
    pub duration_secs: u64,
    /// Quality levels the service reports a nonzero file size for.
    pub qualities: Vec<Quality>,
    /// Whether the service reports the track as streamable for this
    /// account (`RIGHTS.STREAM_ADS_AVAILABLE`).
    pub streamable: bool,
    /// Track-scoped, time-limited access token used by the token-based
    /// source strategy. Absent for some catalog entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_token: Option<String>,
    /// Content hash the legacy CDN paths are signed with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_origin: Option<String>,
    /// Media revision counter, part of the legacy signed path.
    pub media_version: String,
    /// Short unencrypted preview clip URL. Present for public tracks
    /// independent of full-track availability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Audio quality level for full-track delivery.
///
/// The legacy source strategy walks these high → low; the service may
/// only have a subset available per track.
///
/// | Variant  | Format code | Bitrate  |
/// |----------|-------------|----------|
/// | `High`   | `MP3_320`   | 320 kbps |
/// | `Medium` | `MP3_256`   | 256 kbps |
/// | `Low`    | `MP3_128`   | 128 kbps |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    /// 320 kbps MP3.
    High,
    /// 256 kbps MP3.
    Medium,
    /// 128 kbps MP3.
    Low,
}

impl Quality {
    /// All levels in the fixed high → low probe order.
    pub const DESCENDING: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Format code used in API fields (`FILESIZE_<code>`) and legacy
    /// signed paths.
    pub fn format_code(self) -> &'static str {
        match self {
            Self::High => "MP3_320",
            Self::Medium => "MP3_256",
            Self::Low => "MP3_128",
        }
    }

    /// Target bitrate in bits per second.
    pub fn bitrate(self) -> u64 {
        match self {
            Self::High => 320_000,
            Self::Medium => 256_000,
            Self::Low => 128_000,
        }
    }
}

/// A fetchable media URL produced by the source strategy chain,
/// consumed once by the download orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Direct URL to request the payload from.
    pub url: String,
    /// Whether the payload carries the stripe encryption and must go
    /// through the decryptor.
    pub encrypted: bool,
    /// Whether this is the preview-clip fallback. Preview payloads are
    /// plain audio; running them through the cipher corrupts them.
    pub preview: bool,
}
