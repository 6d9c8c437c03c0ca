//! Media source resolution.
//!
//! The delivery infrastructure rotates unpredictably between three URL
//! shapes, so resolution walks a fixed strategy chain, cheapest and most
//! confident first, and degrades to the guaranteed preview clip:
//!
//! 1. **Token** — ask `song.getListData` for a full-media URL; failing
//!    that, construct the 2024-format candidates from the track-scoped
//!    access token.
//! 2. **Legacy** — signed CDN paths, brute-forced over every historical
//!    signing secret and quality level, high → low.
//! 3. **Preview** — the unencrypted preview clip recorded in the
//!    metadata. Last resort, always attempted, never decrypted.
//!
//! Each candidate URL gets a lightweight HEAD probe; a timeout or non-200
//! means "this candidate failed, try the next". Only total exhaustion —
//! preview included — is an error.

use md5::{Digest, Md5};
use serde_json::json;
use tracing::{debug, info};

use crate::client::{DeezerClient, clip};
use crate::error::{DeezerError, Result};
use crate::types::{Quality, ResolvedSource, TrackMetadata};

/// Historical CDN path signing secrets. The service's selection rule is
/// undocumented; all are tried in order, stopping at the first candidate
/// that probes successfully.
const SIGNING_SECRETS: [&str; 3] = ["jo6aey6haid2Teih", "g4el58wc0zvf9na1", ""];

/// A single method of locating a fetchable media URL.
///
/// `Ok(None)` means the strategy has nothing to offer for this track;
/// an `Err` is treated the same way by the chain (logged, advance).
pub(crate) trait SourceStrategy {
    fn name(&self) -> &'static str;
    fn attempt(
        &mut self,
        client: &mut DeezerClient,
        meta: &TrackMetadata,
    ) -> Result<Option<ResolvedSource>>;
}

/// Resolve a fetchable media URL for `meta`.
///
/// Never fails just because no full track is available — the preview
/// clip is the guaranteed fallback. Fails with
/// [`DeezerError::Resolution`] only when even the preview is absent.
pub fn resolve(client: &mut DeezerClient, meta: &TrackMetadata) -> Result<ResolvedSource> {
    run_chain(
        &mut [&mut TokenUrl, &mut LegacyCdn, &mut Preview],
        client,
        meta,
    )
}

/// Walk the ordered strategy list, first success wins.
fn run_chain(
    strategies: &mut [&mut dyn SourceStrategy],
    client: &mut DeezerClient,
    meta: &TrackMetadata,
) -> Result<ResolvedSource> {
    for strategy in strategies.iter_mut() {
        debug!("trying source strategy: {}", strategy.name());
        match strategy.attempt(client, meta) {
            Ok(Some(source)) => {
                info!("resolved via {} strategy: {}", strategy.name(), clip(&source.url));
                return Ok(source);
            }
            Ok(None) => debug!("{}: no usable source", strategy.name()),
            Err(e) => debug!("{}: failed ({e}), advancing", strategy.name()),
        }
    }
    Err(DeezerError::Resolution)
}

/// Strategy 1: token-based resolution (2024 format).
struct TokenUrl;

impl SourceStrategy for TokenUrl {
    fn name(&self) -> &'static str {
        "token"
    }

    fn attempt(
        &mut self,
        client: &mut DeezerClient,
        meta: &TrackMetadata,
    ) -> Result<Option<ResolvedSource>> {
        let candidates = match full_media_url(client, meta) {
            Ok(Some(url)) => vec![url],
            Ok(None) => constructed_token_urls(meta),
            Err(e) => {
                debug!("media list lookup failed: {e}");
                constructed_token_urls(meta)
            }
        };
        Ok(candidates
            .into_iter()
            .find(|url| client.probe(url))
            .map(|url| ResolvedSource {
                url,
                encrypted: true,
                preview: false,
            }))
    }
}

/// Ask `song.getListData` for a ready-made full-media URL.
///
/// Request body: `{ "sng_ids": ["3135556"] }`; the response carries a
/// `MEDIA` list per track whose `full`-type entry, when the account tier
/// permits, holds a signed `HREF`.
fn full_media_url(client: &mut DeezerClient, meta: &TrackMetadata) -> Result<Option<String>> {
    let resp = client.gw_call(
        "song.getListData",
        &json!({ "sng_ids": [meta.id.to_string()] }),
    )?;
    Ok(resp["results"]["data"][0]["MEDIA"].as_array().and_then(|media| {
        media
            .iter()
            .find(|m| m["TYPE"].as_str() == Some("full"))
            .and_then(|m| m["HREF"].as_str())
            .map(String::from)
    }))
}

/// Construct the three known token-URL variants: origin hash,
/// md5(id + token) hash, and token-prefix hash. The CDN shard is the
/// first character of `MD5_ORIGIN`.
fn constructed_token_urls(meta: &TrackMetadata) -> Vec<String> {
    let (Some(token), Some(origin)) = (&meta.track_token, &meta.md5_origin) else {
        debug!("no track token or origin hash; skipping constructed URLs");
        return Vec::new();
    };
    let Some(shard) = origin.chars().next() else {
        return Vec::new();
    };

    let id_hash = hex::encode(Md5::digest(format!("{}{token}", meta.id)));
    let token_prefix = token.get(..32).unwrap_or(token);

    vec![
        format!("https://e-cdns-proxy-{shard}.dzcdn.net/mobile/1/{origin}?{token}"),
        format!("https://e-cdns-proxy-{shard}.dzcdn.net/mobile/1/{id_hash}?{token}"),
        format!("https://e-cdns-proxy-{shard}.dzcdn.net/mobile/1/{token_prefix}?{token}"),
    ]
}

/// Strategy 2: legacy signed CDN paths.
struct LegacyCdn;

impl SourceStrategy for LegacyCdn {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn attempt(
        &mut self,
        client: &mut DeezerClient,
        meta: &TrackMetadata,
    ) -> Result<Option<ResolvedSource>> {
        let Some(origin) = &meta.md5_origin else {
            debug!("no origin hash; legacy paths unavailable");
            return Ok(None);
        };
        let Some(shard) = origin.chars().next() else {
            return Ok(None);
        };

        for quality in Quality::DESCENDING {
            for secret in SIGNING_SECRETS {
                let hash = signed_path(quality, meta.id, &meta.media_version, origin, secret);
                for host in cdn_hosts(shard) {
                    let url = format!("https://{host}/mobile/1/{hash}");
                    if client.probe(&url) {
                        info!("using legacy quality {}", quality.format_code());
                        return Ok(Some(ResolvedSource {
                            url,
                            encrypted: true,
                            preview: false,
                        }));
                    }
                }
            }
        }
        Ok(None)
    }
}

/// Legacy path hash: md5 of `quality¤id¤media_version¤origin` plus the
/// signing secret. The `¤` separator is part of the wire format.
fn signed_path(
    quality: Quality,
    track_id: u64,
    media_version: &str,
    md5_origin: &str,
    secret: &str,
) -> String {
    let part = format!(
        "{}¤{track_id}¤{media_version}¤{md5_origin}{secret}",
        quality.format_code()
    );
    hex::encode(Md5::digest(part))
}

/// Known CDN host shapes, probed in order.
fn cdn_hosts(shard: char) -> [String; 5] {
    [
        format!("e-cdns-proxy-{shard}.dzcdn.net"),
        format!("e-cdn-proxy-{shard}.dzcdn.net"),
        format!("cdns-proxy-{shard}.dzcdn.net"),
        format!("cdn-proxy-{shard}.dzcdn.net"),
        format!("e-cdns-proxy-{shard}.deezer.com"),
    ]
}

/// Strategy 3: preview-clip fallback. Plain audio, never decrypted.
struct Preview;

impl SourceStrategy for Preview {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn attempt(
        &mut self,
        _client: &mut DeezerClient,
        meta: &TrackMetadata,
    ) -> Result<Option<ResolvedSource>> {
        Ok(meta.preview_url.as_ref().map(|url| {
            ResolvedSource {
                url: url.clone(),
                encrypted: false,
                preview: true,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TrackMetadata {
        TrackMetadata {
            id: 3_135_556,
            title: "One More Time".into(),
            artist: "Daft Punk".into(),
            duration_secs: 320,
            qualities: vec![Quality::High, Quality::Low],
            streamable: true,
            track_token: Some("AAAAtoken".into()),
            md5_origin: Some("51afcde9f56a132096c0496cc95eb24b".into()),
            media_version: "1".into(),
            preview_url: Some("https://cdnt-preview.dzcdn.net/api/1/abc".into()),
        }
    }

    fn source(url: &str) -> ResolvedSource {
        ResolvedSource {
            url: url.into(),
            encrypted: true,
            preview: false,
        }
    }

    /// Strategy double that returns a canned outcome and counts calls.
    struct Scripted {
        name: &'static str,
        outcome: Result<Option<ResolvedSource>>,
        calls: u32,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: Result<Option<ResolvedSource>>) -> Self {
            Self { name, outcome, calls: 0 }
        }
    }

    impl SourceStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn attempt(
            &mut self,
            _client: &mut DeezerClient,
            _meta: &TrackMetadata,
        ) -> Result<Option<ResolvedSource>> {
            self.calls += 1;
            match &self.outcome {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(DeezerError::Api("scripted failure".into())),
            }
        }
    }

    #[test]
    fn chain_stops_at_first_success() {
        let mut first = Scripted::new("first", Ok(None));
        let mut second = Scripted::new("second", Ok(Some(source("https://x/2"))));
        let mut third = Scripted::new("third", Ok(Some(source("https://x/3"))));

        let resolved = run_chain(
            &mut [&mut first, &mut second, &mut third],
            &mut DeezerClient::stub(),
            &meta(),
        )
        .unwrap();

        assert_eq!(resolved.url, "https://x/2");
        assert_eq!(first.calls, 1);
        assert_eq!(second.calls, 1);
        assert_eq!(third.calls, 0, "later strategies must not run");
    }

    #[test]
    fn chain_advances_past_errors() {
        let mut failing = Scripted::new("failing", Err(DeezerError::Api(String::new())));
        let mut fallback = Scripted::new("fallback", Ok(Some(source("https://x/ok"))));

        let resolved = run_chain(
            &mut [&mut failing, &mut fallback],
            &mut DeezerClient::stub(),
            &meta(),
        )
        .unwrap();

        assert_eq!(resolved.url, "https://x/ok");
    }

    #[test]
    fn exhausted_chain_is_resolution_error() {
        let mut a = Scripted::new("a", Ok(None));
        let mut b = Scripted::new("b", Err(DeezerError::Api(String::new())));

        let err = run_chain(&mut [&mut a, &mut b], &mut DeezerClient::stub(), &meta())
            .unwrap_err();
        assert!(matches!(err, DeezerError::Resolution));
    }

    #[test]
    fn preview_strategy_marks_source_unencrypted() {
        let got = Preview
            .attempt(&mut DeezerClient::stub(), &meta())
            .unwrap()
            .unwrap();
        assert!(got.preview);
        assert!(!got.encrypted);
        assert_eq!(got.url, "https://cdnt-preview.dzcdn.net/api/1/abc");
    }

    #[test]
    fn preview_strategy_none_without_url() {
        let mut m = meta();
        m.preview_url = None;
        assert!(Preview.attempt(&mut DeezerClient::stub(), &m).unwrap().is_none());
    }

    #[test]
    fn constructed_token_urls_cover_all_variants() {
        let urls = constructed_token_urls(&meta());
        assert_eq!(urls.len(), 3);
        // Shard comes from the first origin character.
        assert!(urls.iter().all(|u| u.starts_with("https://e-cdns-proxy-5.dzcdn.net/mobile/1/")));
        assert!(urls[0].contains("51afcde9f56a132096c0496cc95eb24b?AAAAtoken"));
        // md5("3135556AAAAtoken")
        assert!(urls[1].contains("9297bbe9a8eb829ef4054e74948a5cca?AAAAtoken"));
        // Token shorter than 32 chars is used whole.
        assert!(urls[2].contains("AAAAtoken?AAAAtoken"));
    }

    #[test]
    fn constructed_token_urls_need_token_and_origin() {
        let mut m = meta();
        m.track_token = None;
        assert!(constructed_token_urls(&m).is_empty());
    }

    #[test]
    fn signed_path_known_answers() {
        let origin = "51afcde9f56a132096c0496cc95eb24b";
        assert_eq!(
            signed_path(Quality::Low, 3_135_556, "1", origin, "jo6aey6haid2Teih"),
            "6d55d365bb5aaf7d2e2ad9320e79560c"
        );
        assert_eq!(
            signed_path(Quality::Low, 3_135_556, "1", origin, "g4el58wc0zvf9na1"),
            "97ce4f30f448bad294392743f0f7fa98"
        );
        assert_eq!(
            signed_path(Quality::Low, 3_135_556, "1", origin, ""),
            "eac724940df1c8a8f092a53921607c4c"
        );
    }

    #[test]
    fn cdn_hosts_cover_known_shapes() {
        let hosts = cdn_hosts('a');
        assert_eq!(hosts[0], "e-cdns-proxy-a.dzcdn.net");
        assert_eq!(hosts[4], "e-cdns-proxy-a.deezer.com");
    }
}
