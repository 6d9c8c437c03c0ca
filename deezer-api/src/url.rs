//! Track reference parsing.
//!
//! Accepted forms:
//!
//! - bare numeric id: `3135556`
//! - full track URL: `https://www.deezer.com/track/3135556` (locale
//!   segments like `/en/` are fine)
//! - short link: `https://link.deezer.com/s/...` — resolved with one
//!   redirect-following GET, then parsed like a full URL
//!
//! Anything else is a [`DeezerError::Config`]. Short-link resolution is
//! the only form that touches the network, and it happens before
//! authentication with a bare one-shot client.

use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::debug;

use crate::client::USER_AGENT;
use crate::error::{DeezerError, Result};

const SHORT_LINK_HOST: &str = "link.deezer.com";
const REDIRECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Turn a user-supplied track reference into a numeric track id.
pub fn parse_track_ref(input: &str) -> Result<u64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DeezerError::Config("track reference is empty".into()));
    }

    if input.bytes().all(|b| b.is_ascii_digit()) {
        return input
            .parse()
            .map_err(|_| DeezerError::Config(format!("track id out of range: {input}")));
    }

    if input.contains(SHORT_LINK_HOST) {
        let resolved = resolve_short_link(input)?;
        return extract_from_url(&resolved).ok_or_else(|| {
            DeezerError::Config(format!("could not extract track id from: {resolved}"))
        });
    }

    if input.contains("deezer.com") {
        return extract_from_url(input).ok_or_else(|| {
            DeezerError::Config(format!("could not extract track id from URL: {input}"))
        });
    }

    Err(DeezerError::Config(format!(
        "not a track id or deezer URL: {input}"
    )))
}

fn extract_from_url(url: &str) -> Option<u64> {
    let re = Regex::new(r"/track/(\d+)").expect("static pattern");
    re.captures(url).and_then(|c| c[1].parse().ok())
}

/// Follow a short link to its canonical track URL.
///
/// Redirects are followed automatically; if the chain somehow ends back
/// on the short-link host, a second no-follow request reads the raw
/// `Location` header instead.
fn resolve_short_link(url: &str) -> Result<String> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REDIRECT_TIMEOUT)
        .build()?;
    let final_url = client.get(url).send()?.url().to_string();
    debug!("short link redirected to: {final_url}");

    if !final_url.contains(SHORT_LINK_HOST) {
        return Ok(final_url);
    }

    let no_follow = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .timeout(REDIRECT_TIMEOUT)
        .build()?;
    let resp = no_follow.get(url).send()?;
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .inspect(|loc| debug!("found redirect location: {loc}"))
        .ok_or_else(|| DeezerError::Config(format!("could not resolve short link: {url}")))
}
