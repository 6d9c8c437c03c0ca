use blowfish::Blowfish;
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, KeyInit};
use md5::{Digest, Md5};

/// Service secret folded into every track key.
const KEY_SECRET: [u8; 16] = *b"g4el58wc0zvf9na1";

/// Blowfish block granularity in bytes.
pub(crate) const CIPHER_BLOCK: usize = 8;

/// Derive the 16-byte Blowfish key for a track.
///
/// MD5 the decimal id string, then XOR the two hex-digit halves of the
/// digest with the service secret, character-wise. Pure and
/// deterministic; recomputed per track, never cached across tracks.
pub fn track_key(track_id: u64) -> [u8; 16] {
    let digest = hex::encode(Md5::digest(track_id.to_string()));
    let hex = digest.as_bytes();

    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = hex[i] ^ hex[i + 16] ^ KEY_SECRET[i];
    }
    key
}

/// Build the stripe cipher for a derived key.
pub(crate) fn new_cipher(key: &[u8; 16]) -> Blowfish {
    Blowfish::new_from_slice(key).expect("16-byte key")
}

/// Decrypt a stripe in place, one independent 8-byte block at a time
/// (no chaining). The stripe length must be a multiple of the cipher
/// block size; callers pass whole 2048-byte stripes.
pub(crate) fn decrypt_stripe(cipher: &Blowfish, stripe: &mut [u8]) {
    for block in stripe.chunks_exact_mut(CIPHER_BLOCK) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// Forward transform, used by tests to build encrypted fixtures.
#[cfg(test)]
pub(crate) fn encrypt_stripe(cipher: &Blowfish, stripe: &mut [u8]) {
    use cipher::BlockEncrypt;
    for block in stripe.chunks_exact_mut(CIPHER_BLOCK) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}
