//! Deezer private API client library.
//!
//! Provides authenticated access to the gw-light API: session handshake,
//! track metadata, and media source resolution for the download pipeline.
//!
//! # Authentication
//!
//! All API calls require a valid `arl` cookie obtained from a logged-in
//! browser session, supplied via the environment (nothing is persisted).
//!
//! ```no_run
//! use deezer_api::auth::Credential;
//! use deezer_api::DeezerClient;
//!
//! let credential = Credential::new(&std::env::var("DEEZER_ARL_TOKEN").unwrap()).unwrap();
//! let mut client = DeezerClient::establish(&credential).unwrap();
//! let meta = client.track_details(3135556).unwrap();
//! let source = deezer_api::source::resolve(&mut client, &meta).unwrap();
//! ```
//!
//! # API method mapping
//!
//! | Function                          | gw-light method       | Description          |
//! |-----------------------------------|-----------------------|----------------------|
//! | [`DeezerClient::establish`]       | `deezer.getUserData`  | Handshake / token    |
//! | [`DeezerClient::track_details`]   | `deezer.pageTrack`    | Track metadata       |
//! | [`source::resolve`]               | `song.getListData` + CDN probes | Media URL  |
//! | [`url::parse_track_ref`]          | (redirect resolution) | Id from URL/short link |
//!
//! The session's short-lived API token rides every call as a query
//! parameter and is refreshed in place, once, when the server signals
//! `VALID_TOKEN_REQUIRED`.

pub mod auth;
pub mod client;
pub mod error;
pub mod source;
mod track;
pub mod types;
pub mod url;

pub use client::DeezerClient;
pub use error::{DeezerError, Result};
