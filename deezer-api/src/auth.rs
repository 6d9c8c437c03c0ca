//! Credential validation and session state.
//!
//! Authentication is built on the long-lived `arl` cookie issued to a
//! logged-in browser. It can be obtained from browser developer tools →
//! Application → Cookies on `www.deezer.com`; typical lifetime is several
//! months. The cookie value is ~192 alphanumeric characters.
//!
//! The handshake (see [`DeezerClient::establish`](crate::DeezerClient::establish))
//! trades the cookie for a short-lived API token that must accompany every
//! gw-light call. Nothing is persisted; the session lives and dies with
//! the process.

use regex::Regex;

use crate::error::{DeezerError, Result};

/// Minimum plausible credential length. Real tokens are ~192 characters.
const MIN_CREDENTIAL_LEN: usize = 100;

/// A validated long-lived account credential (the `arl` cookie value).
///
/// Construction enforces length and character class, so a `Credential`
/// in hand is always well-formed. Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Credential(String);

impl Credential {
    /// Validate and wrap a raw credential string.
    ///
    /// # Errors
    ///
    /// [`DeezerError::Config`] if the value is empty, shorter than ~192
    /// characters, or contains non-alphanumeric characters.
    pub fn new(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DeezerError::Config("arl credential is empty".into()));
        }
        if raw.len() < MIN_CREDENTIAL_LEN {
            return Err(DeezerError::Config(format!(
                "arl credential too short ({} chars, should be ~192)",
                raw.len()
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(DeezerError::Config(
                "arl credential contains invalid characters (should be alphanumeric only)".into(),
            ));
        }
        Ok(Self(raw.to_owned()))
    }

    /// The raw cookie value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Short-lived session state established by the handshake.
///
/// Owned by the client; only the token-refresh path replaces it.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Confirmed API token (`checkForm`), appended to every
    /// authenticated call.
    pub api_token: String,
    /// Numeric id of the authenticated user.
    pub user_id: u64,
    /// Display name of the authenticated user.
    pub user_name: String,
}

/// Scrape the embedded short-lived API token out of the landing page HTML.
///
/// The page embeds `"api_token":"<value>"` inside an inline JSON config
/// blob. Returns `None` if the marker is absent (the handshake then
/// proceeds with an empty seed token, which the user-data endpoint
/// accepts for cookie-authenticated sessions).
pub(crate) fn extract_api_token(html: &str) -> Option<String> {
    let re = Regex::new(r#""api_token":"([^"]+)""#).expect("static pattern");
    re.captures(html).map(|c| c[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_rejects_short() {
        let err = Credential::new("abc123").unwrap_err();
        assert!(matches!(err, DeezerError::Config(_)));
    }

    #[test]
    fn credential_rejects_bad_charset() {
        let raw = "x".repeat(150) + "!";
        let err = Credential::new(&raw).unwrap_err();
        assert!(matches!(err, DeezerError::Config(_)));
    }

    #[test]
    fn credential_rejects_empty() {
        assert!(Credential::new("   ").is_err());
    }

    #[test]
    fn credential_accepts_typical_token() {
        let raw = "aA9".repeat(64); // 192 alphanumeric chars
        let cred = Credential::new(&raw).unwrap();
        assert_eq!(cred.as_str().len(), 192);
    }

    #[test]
    fn extracts_token_from_page_html() {
        let html = r#"<html><script>window.__DZR_APP_STATE__ = {"user":{"id":1},
            "api_token":"ABcd1234efGH","gatekeeps":{}}</script></html>"#;
        assert_eq!(extract_api_token(html).as_deref(), Some("ABcd1234efGH"));
    }

    #[test]
    fn extract_token_none_when_absent() {
        assert_eq!(extract_api_token("<html><body>login</body></html>"), None);
    }
}
