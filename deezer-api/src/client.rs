//! HTTP client for the Deezer private gw-light API.
//!
//! All authenticated requests go through the same envelope:
//!
//! 1. `POST https://www.deezer.com/ajax/gw-light.php` with query
//!    parameters `method`, `input=3`, `api_version=1.0`, `api_token`
//! 2. JSON request body with the method's arguments
//! 3. Cookie-based identity: the long-lived `arl` cookie rides the
//!    shared cookie jar on every call
//!
//! The server responds with JSON containing `error` and `results` fields:
//!
//! ```json
//! {
//!   "error": [],
//!   "results": { ...method-specific fields... }
//! }
//! ```
//!
//! A non-empty `error` is mapped to [`DeezerError::Api`], except for the
//! explicit token-rejection signal (`VALID_TOKEN_REQUIRED` / CSRF), which
//! triggers a single in-place handshake refresh before the call is
//! retried once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::auth::{Credential, Session, extract_api_token};
use crate::error::{DeezerError, Result};

const BASE_URL: &str = "https://www.deezer.com";
const API_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Connect/read timeout for API calls and body transfers.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Tighter timeout for candidate-URL existence probes; a slow candidate
/// is treated as a failed candidate.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking client for the Deezer gw-light API.
///
/// Holds a [`reqwest::blocking::Client`] (with the `arl` cookie jar) and
/// the short-lived [`Session`] established by the handshake. API methods
/// are implemented in separate modules (`track`, `source`) as
/// `impl DeezerClient` blocks and free functions.
///
/// The session is mutated in place only by the token-refresh path; all
/// other code treats it as read-only.
pub struct DeezerClient {
    http: Client,
    session: Session,
}

impl DeezerClient {
    /// Perform the authentication handshake and return a ready client.
    ///
    /// Protocol: seed the cookie jar with the `arl` credential, fetch the
    /// landing page, scrape the embedded short-lived token out of the
    /// HTML, then exchange it via `deezer.getUserData` for the confirmed
    /// token and user identity.
    ///
    /// # Errors
    ///
    /// [`DeezerError::Auth`] if the service rejects the credential;
    /// [`DeezerError::Http`] on transport failure.
    pub fn establish(credential: &Credential) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let cookie = format!("arl={}; Domain=.deezer.com; Path=/", credential.as_str());
        jar.add_cookie_str(&cookie, &BASE_URL.parse().expect("static URL"));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .cookie_provider(jar)
            .timeout(HTTP_TIMEOUT)
            .build()?;

        let mut client = Self {
            http,
            session: Session::default(),
        };
        client.handshake()?;
        info!(
            "authenticated as user: {} (id={})",
            client.session.user_name, client.session.user_id
        );
        Ok(client)
    }

    /// Return a reference to the current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the landing-page + user-data handshake, replacing the session.
    fn handshake(&mut self) -> Result<()> {
        let html = self
            .http
            .get(BASE_URL)
            .send()?
            .error_for_status()?
            .text()?;

        let seed = extract_api_token(&html).unwrap_or_default();
        if seed.is_empty() {
            debug!("no embedded api token found in landing page");
        } else {
            debug!("found initial api token: {}...", seed.get(..20).unwrap_or(&seed));
        }

        let resp = self.gw_send("deezer.getUserData", &seed, &json!({}))?;
        if let Some(msg) = api_error(&resp) {
            return Err(DeezerError::Auth(if is_token_rejection(&msg) {
                "arl credential is invalid or expired".into()
            } else {
                msg
            }));
        }

        let results = &resp["results"];
        let api_token = results["checkForm"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                DeezerError::Auth("no API token in user data (arl credential may be invalid)".into())
            })?;
        let user = &results["USER"];
        self.session = Session {
            api_token: api_token.to_owned(),
            user_id: user["USER_ID"].as_u64().unwrap_or(0),
            user_name: user["BLOG_NAME"]
                .as_str()
                .or_else(|| user["USERNAME"].as_str())
                .unwrap_or("Unknown")
                .to_owned(),
        };
        Ok(())
    }

    /// Send an authenticated gw-light call.
    ///
    /// `method` is the API method name, e.g. `deezer.pageTrack`.
    /// `payload` is the JSON body.
    ///
    /// Returns the full JSON response on success. If the server signals
    /// an invalid token, the handshake is re-run once and the call
    /// retried; a second rejection surfaces [`DeezerError::Auth`].
    pub(crate) fn gw_call(&mut self, method: &str, payload: &Value) -> Result<Value> {
        let token = self.session.api_token.clone();
        let resp = self.gw_send(method, &token, payload)?;
        let Some(msg) = api_error(&resp) else {
            return Ok(resp);
        };
        if !is_token_rejection(&msg) {
            return Err(DeezerError::Api(msg));
        }

        debug!("api token rejected, re-running handshake");
        self.handshake()?;
        let token = self.session.api_token.clone();
        let retry = self.gw_send(method, &token, payload)?;
        match api_error(&retry) {
            None => Ok(retry),
            Some(msg) if is_token_rejection(&msg) => Err(DeezerError::Auth(
                "API token rejected after refresh; the arl credential is invalid or expired".into(),
            )),
            Some(msg) => Err(DeezerError::Api(msg)),
        }
    }

    /// One raw gw-light POST with an explicit token, no error handling.
    fn gw_send(&self, method: &str, api_token: &str, payload: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(API_URL)
            .query(&[
                ("method", method),
                ("input", "3"),
                ("api_version", "1.0"),
                ("api_token", api_token),
            ])
            .header(ACCEPT, "application/json, text/plain, */*")
            .json(payload)
            .send()?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    /// Lightweight existence check for a candidate media URL.
    ///
    /// A HEAD request with a short timeout; anything other than a clean
    /// 200 (timeouts included) means "this candidate failed, try the
    /// next".
    pub(crate) fn probe(&self, url: &str) -> bool {
        match self.http.head(url).timeout(PROBE_TIMEOUT).send() {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => true,
            Ok(resp) => {
                debug!("candidate not available (HTTP {}): {}", resp.status(), clip(url));
                false
            }
            Err(e) => {
                debug!("candidate not accessible ({e}): {}", clip(url));
                false
            }
        }
    }

    /// Open a streaming GET to a resolved media URL.
    ///
    /// The returned [`Response`] implements [`std::io::Read`]; the body
    /// is consumed incrementally by the caller.
    pub fn open_stream(&self, url: &str) -> Result<Response> {
        Ok(self.http.get(url).send()?.error_for_status()?)
    }

    /// Client with an empty session and no network history, for
    /// exercising request-independent logic in tests.
    #[cfg(test)]
    pub(crate) fn stub() -> Self {
        Self {
            http: Client::new(),
            session: Session::default(),
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

/// Extract the error payload from a gw-light response, if any.
///
/// The field is present but empty (`[]` or `{}`) on success.
fn api_error(resp: &Value) -> Option<String> {
    match resp.get("error")? {
        Value::Null => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(m) if m.is_empty() => None,
        other => Some(other.to_string()),
    }
}

fn is_token_rejection(msg: &str) -> bool {
    msg.contains("VALID_TOKEN_REQUIRED") || msg.contains("Invalid CSRF token")
}

/// Trim a URL for log lines; CDN URLs carry long opaque tokens.
pub(crate) fn clip(url: &str) -> &str {
    url.get(..80).unwrap_or(url)
}
