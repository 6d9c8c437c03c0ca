//! Track metadata API.
//!
//! Endpoint: `deezer.pageTrack`
//!
//! Request body: `{ "sng_id": 3135556 }`
//!
//! Response (trimmed):
//! ```json
//! {
//!   "error": [],
//!   "results": {
//!     "DATA": {
//!       "SNG_ID": "3135556",
//!       "SNG_TITLE": "One More Time",
//!       "ART_NAME": "Daft Punk",
//!       "DURATION": "320",
//!       "FILESIZE_MP3_128": "5142741",
//!       "FILESIZE_MP3_320": "12832516",
//!       "MD5_ORIGIN": "51afcde9f56a132096c0496cc95eb24b",
//!       "MEDIA_VERSION": "3",
//!       "TRACK_TOKEN": "AAAA...",
//!       "RIGHTS": { "STREAM_ADS_AVAILABLE": true },
//!       "MEDIA": [ { "TYPE": "preview", "HREF": "https://cdnt-preview..." } ]
//!     }
//!   }
//! }
//! ```
//!
//! Most numeric fields arrive as JSON strings; parsing accepts both.
//! `DATA` is absent when the id does not resolve. The preview entry is
//! present for public tracks independent of full-track availability.

use serde_json::{Value, json};
use tracing::debug;

use crate::client::DeezerClient;
use crate::error::{DeezerError, Result};
use crate::types::{Quality, TrackMetadata};

impl DeezerClient {
    /// Fetch track metadata by id. Called exactly once per run.
    ///
    /// # Errors
    ///
    /// - [`DeezerError::TrackNotFound`] — the id does not resolve
    /// - [`DeezerError::Rights`] — the service reports the track as
    ///   unavailable for this account's region or tier
    pub fn track_details(&mut self, id: u64) -> Result<TrackMetadata> {
        let resp = self.gw_call("deezer.pageTrack", &json!({ "sng_id": id }))?;
        let data = &resp["results"]["DATA"];
        if data.is_null() {
            return Err(DeezerError::TrackNotFound(id));
        }

        let meta = parse_track_data(id, data);
        debug!(
            "track {}: qualities {:?}, token={}, preview={}",
            meta.id,
            meta.qualities,
            meta.track_token.is_some(),
            meta.preview_url.is_some(),
        );

        if !meta.streamable {
            return Err(DeezerError::Rights(format!(
                "{} - {}",
                meta.artist, meta.title
            )));
        }
        Ok(meta)
    }
}

/// Build a [`TrackMetadata`] from the raw `DATA` object.
fn parse_track_data(id: u64, data: &Value) -> TrackMetadata {
    let qualities = Quality::DESCENDING
        .into_iter()
        .filter(|q| as_u64(&data[format!("FILESIZE_{}", q.format_code())]) > 0)
        .collect();

    // Absent RIGHTS means streamable; the field only appears to restrict.
    let streamable = data["RIGHTS"]["STREAM_ADS_AVAILABLE"]
        .as_bool()
        .unwrap_or(true);

    let preview_url = data["MEDIA"].as_array().and_then(|media| {
        media
            .iter()
            .find(|m| m["TYPE"].as_str() == Some("preview"))
            .and_then(|m| m["HREF"].as_str())
            .map(String::from)
    });

    TrackMetadata {
        id,
        title: data["SNG_TITLE"].as_str().unwrap_or("Unknown Title").to_owned(),
        artist: data["ART_NAME"].as_str().unwrap_or("Unknown Artist").to_owned(),
        duration_secs: as_u64(&data["DURATION"]),
        qualities,
        streamable,
        track_token: non_empty(&data["TRACK_TOKEN"]),
        md5_origin: non_empty(&data["MD5_ORIGIN"]),
        media_version: non_empty(&data["MEDIA_VERSION"]).unwrap_or_else(|| "1".to_owned()),
        preview_url,
    }
}

/// Read a numeric field that the API serializes as either number or string.
fn as_u64(v: &Value) -> u64 {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}

fn non_empty(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Value {
        json!({
            "SNG_ID": "3135556",
            "SNG_TITLE": "One More Time",
            "ART_NAME": "Daft Punk",
            "DURATION": "320",
            "FILESIZE_MP3_128": "5142741",
            "FILESIZE_MP3_256": "0",
            "FILESIZE_MP3_320": "12832516",
            "MD5_ORIGIN": "51afcde9f56a132096c0496cc95eb24b",
            "MEDIA_VERSION": "3",
            "TRACK_TOKEN": "AAAAtoken",
            "RIGHTS": { "STREAM_ADS_AVAILABLE": true },
            "MEDIA": [
                { "TYPE": "preview", "HREF": "https://cdnt-preview.dzcdn.net/api/1/abc" }
            ]
        })
    }

    #[test]
    fn parses_core_fields() {
        let meta = parse_track_data(3_135_556, &fixture());
        assert_eq!(meta.id, 3_135_556);
        assert_eq!(meta.title, "One More Time");
        assert_eq!(meta.artist, "Daft Punk");
        assert_eq!(meta.duration_secs, 320);
        assert_eq!(meta.media_version, "3");
        assert_eq!(meta.track_token.as_deref(), Some("AAAAtoken"));
        assert_eq!(
            meta.md5_origin.as_deref(),
            Some("51afcde9f56a132096c0496cc95eb24b")
        );
    }

    #[test]
    fn qualities_skip_zero_sizes() {
        let meta = parse_track_data(1, &fixture());
        assert_eq!(meta.qualities, vec![Quality::High, Quality::Low]);
    }

    #[test]
    fn preview_url_extracted_from_media_list() {
        let meta = parse_track_data(1, &fixture());
        assert_eq!(
            meta.preview_url.as_deref(),
            Some("https://cdnt-preview.dzcdn.net/api/1/abc")
        );
    }

    #[test]
    fn missing_rights_defaults_to_streamable() {
        let mut data = fixture();
        data.as_object_mut().unwrap().remove("RIGHTS");
        assert!(parse_track_data(1, &data).streamable);
    }

    #[test]
    fn rights_flag_false_detected() {
        let data = json!({
            "SNG_TITLE": "Locked",
            "ART_NAME": "Nobody",
            "RIGHTS": { "STREAM_ADS_AVAILABLE": false }
        });
        assert!(!parse_track_data(1, &data).streamable);
    }

    #[test]
    fn empty_token_fields_become_none() {
        let data = json!({ "TRACK_TOKEN": "", "MD5_ORIGIN": "" });
        let meta = parse_track_data(1, &data);
        assert_eq!(meta.track_token, None);
        assert_eq!(meta.md5_origin, None);
        assert_eq!(meta.media_version, "1");
    }
}
