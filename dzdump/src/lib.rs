//! Track download pipeline: metadata → source resolution → streaming
//! transfer → stripe decryption → file on disk.
//!
//! [`download`] is the single entry point; it owns the whole sequence
//! for exactly one track and reports progress through a caller-supplied
//! callback. Preview sources bypass the decryptor entirely — preview
//! payloads are plain audio, and running them through the cipher
//! corrupts them.

mod cipher;
mod decoder;
pub mod error;
mod sanitize;

pub use cipher::track_key;
pub use decoder::{EncryptionContext, STRIPE_PERIOD, STRIPE_SIZE, StripeDecryptor};
pub use error::{DumpError, Result};
pub use sanitize::sanitize_filename;

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use deezer_api::DeezerClient;
use deezer_api::source;
use tracing::{info, warn};

/// Progress callback: (bytes written so far, total payload size if the
/// server sent one). Total is `None` for chunked transfer encodings.
pub type Progress<'a> = dyn FnMut(u64, Option<u64>) + 'a;

/// Outcome of a completed download.
#[derive(Debug)]
pub struct Downloaded {
    /// Path of the written audio file.
    pub path: PathBuf,
    /// Final byte count.
    pub bytes: u64,
    /// Whether the preview fallback was used.
    pub preview: bool,
}

/// Download one track to `output_dir`, decrypting as needed.
///
/// Writes `<output_dir>/<Artist - Title.mp3>` (sanitized), overwriting
/// any same-named prior file, and returns the path and byte count.
pub fn download(
    client: &mut DeezerClient,
    track_id: u64,
    output_dir: &Path,
    progress: &mut Progress<'_>,
) -> Result<Downloaded> {
    let meta = client.track_details(track_id)?;
    info!("track: {} - {}", meta.artist, meta.title);

    let source = source::resolve(client, &meta)?;
    if source.preview {
        warn!("falling back to preview clip (short excerpt only)");
    }

    let body = client.open_stream(&source.url)?;
    let total = body.content_length();

    fs::create_dir_all(output_dir)?;
    let filename = sanitize_filename(&format!("{} - {}.mp3", meta.artist, meta.title));
    let path = output_dir.join(filename);

    let ctx = source
        .encrypted
        .then(|| EncryptionContext::for_track(track_id));
    let mut out = BufWriter::new(File::create(&path)?);
    let bytes = copy_source(body, &mut out, ctx.as_ref(), total, progress)?;
    out.flush()?;

    info!("downloaded: {} ({bytes} bytes)", path.display());
    Ok(Downloaded {
        path,
        bytes,
        preview: source.preview,
    })
}

/// Pump a payload into `out`, decrypting when a context is given.
///
/// Plain payloads (previews) are copied byte-identical.
fn copy_source<R: Read, W: Write>(
    body: R,
    out: &mut W,
    ctx: Option<&EncryptionContext>,
    total: Option<u64>,
    progress: &mut Progress<'_>,
) -> Result<u64> {
    let mut written = 0u64;
    match ctx {
        Some(ctx) => {
            for stripe in StripeDecryptor::new(body, ctx) {
                let stripe = stripe?;
                out.write_all(&stripe)?;
                written += stripe.len() as u64;
                progress(written, total);
            }
        }
        None => {
            let mut body = body;
            let mut buf = [0u8; 8192];
            loop {
                let n = body.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])?;
                written += n as u64;
                progress(written, total);
            }
        }
    }
    Ok(written)
}
