//! Streaming stripe decryption.
//!
//! Full-track payloads arrive striped: the body is a sequence of
//! 2048-byte stripes, and every third stripe (positions 0, 3, 6, ...)
//! is Blowfish-encrypted in independent-block mode with the track key.
//! The other stripes, and any short trailing stripe, are plain audio
//! bytes. Preview clips are entirely plain and must never come through
//! here.

use std::io::{self, Read};

use blowfish::Blowfish;
use tracing::debug;

use crate::cipher;

/// Stripe size of the wire format.
pub const STRIPE_SIZE: usize = 2048;

/// Every `STRIPE_PERIOD`-th stripe is encrypted.
pub const STRIPE_PERIOD: u64 = 3;

/// Per-track decryption parameters, derived from the track id.
#[derive(Debug, Clone)]
pub struct EncryptionContext {
    key: [u8; 16],
}

impl EncryptionContext {
    /// Derive the context for a track.
    pub fn for_track(track_id: u64) -> Self {
        Self {
            key: cipher::track_key(track_id),
        }
    }

    /// The derived Blowfish key.
    pub fn key(&self) -> &[u8; 16] {
        &self.key
    }
}

/// Lazy decryptor over a byte stream.
///
/// Yields one plaintext stripe per iteration in a single forward pass;
/// the source is consumed and the sequence is finite. A final stripe
/// shorter than [`STRIPE_SIZE`] is emitted unmodified even at an
/// encrypted position — trailing partial stripes are expected at stream
/// end and salvage beats aborting the transfer.
pub struct StripeDecryptor<R> {
    source: R,
    cipher: Blowfish,
    index: u64,
    done: bool,
}

impl<R: Read> StripeDecryptor<R> {
    pub fn new(source: R, ctx: &EncryptionContext) -> Self {
        Self {
            source,
            cipher: cipher::new_cipher(ctx.key()),
            index: 0,
            done: false,
        }
    }

    /// Read until the stripe buffer is full or the source ends.
    fn fill_stripe(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for StripeDecryptor<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut stripe = vec![0u8; STRIPE_SIZE];
        let filled = match self.fill_stripe(&mut stripe) {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        stripe.truncate(filled);

        if self.index % STRIPE_PERIOD == 0 {
            if filled == STRIPE_SIZE {
                cipher::decrypt_stripe(&self.cipher, &mut stripe);
            } else {
                debug!("stripe {} undersized ({filled} bytes), emitting unmodified", self.index);
            }
        }

        if filled < STRIPE_SIZE {
            self.done = true;
        }
        self.index += 1;
        Some(Ok(stripe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{encrypt_stripe, new_cipher, track_key};

    const TRACK_ID: u64 = 3_135_556;

    fn plaintext(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 251).unwrap()).collect()
    }

    /// Apply the service's forward transform: encrypt every third full
    /// stripe, leave everything else alone.
    fn stripe_encrypt(data: &[u8]) -> Vec<u8> {
        let cipher = new_cipher(&track_key(TRACK_ID));
        let mut out = data.to_vec();
        for (i, stripe) in out.chunks_mut(STRIPE_SIZE).enumerate() {
            if i as u64 % STRIPE_PERIOD == 0 && stripe.len() == STRIPE_SIZE {
                encrypt_stripe(&cipher, stripe);
            }
        }
        out
    }

    fn decrypt_all(data: &[u8]) -> Vec<u8> {
        let ctx = EncryptionContext::for_track(TRACK_ID);
        StripeDecryptor::new(data, &ctx)
            .map(Result::unwrap)
            .collect::<Vec<_>>()
            .concat()
    }

    #[test]
    fn only_every_third_stripe_is_transformed() {
        let plain = plaintext(STRIPE_SIZE * 7);
        let wire = stripe_encrypt(&plain);

        for (i, (p, w)) in plain
            .chunks(STRIPE_SIZE)
            .zip(wire.chunks(STRIPE_SIZE))
            .enumerate()
        {
            if i % 3 == 0 {
                assert_ne!(p, w, "stripe {i} should be transformed");
            } else {
                assert_eq!(p, w, "stripe {i} must pass through");
            }
        }
    }

    #[test]
    fn round_trips_one_stripe() {
        let plain = plaintext(STRIPE_SIZE);
        assert_eq!(decrypt_all(&stripe_encrypt(&plain)), plain);
    }

    #[test]
    fn round_trips_three_stripes() {
        let plain = plaintext(STRIPE_SIZE * 3);
        assert_eq!(decrypt_all(&stripe_encrypt(&plain)), plain);
    }

    #[test]
    fn round_trips_ten_stripes_with_partial_tail() {
        let plain = plaintext(STRIPE_SIZE * 9 + 1000);
        assert_eq!(decrypt_all(&stripe_encrypt(&plain)), plain);
    }

    #[test]
    fn undersized_first_stripe_passes_through() {
        // Shorter than one stripe, lands on an encrypted position.
        let plain = plaintext(100);
        assert_eq!(decrypt_all(&plain), plain);
    }

    #[test]
    fn empty_source_yields_nothing() {
        let ctx = EncryptionContext::for_track(TRACK_ID);
        let empty: &[u8] = &[];
        let mut dec = StripeDecryptor::new(empty, &ctx);
        assert!(dec.next().is_none());
    }

    #[test]
    fn single_forward_pass_ends_cleanly() {
        let plain = plaintext(STRIPE_SIZE + 10);
        let wire = stripe_encrypt(&plain);
        let ctx = EncryptionContext::for_track(TRACK_ID);
        let mut dec = StripeDecryptor::new(wire.as_slice(), &ctx);
        assert!(dec.next().is_some());
        assert!(dec.next().is_some());
        assert!(dec.next().is_none());
        assert!(dec.next().is_none());
    }
}
