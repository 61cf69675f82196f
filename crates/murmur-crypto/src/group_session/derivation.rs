//! Pickle key derivation using HKDF

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use super::message::NONCE_SIZE;

/// Label for the pickle encryption key
const CIPHER_KEY_LABEL: &[u8] = b"murmurPickleCipherV1";

/// Label for the synthetic nonce key
const NONCE_KEY_LABEL: &[u8] = b"murmurPickleNonceV1";

/// Subkeys derived from a caller's 32-byte pickle key.
///
/// The caller's key is never used directly, so the AEAD key and the nonce key
/// stay independent.
pub(crate) struct PickleKeys {
    cipher_key: [u8; 32],
    nonce_key: [u8; 32],
}

impl PickleKeys {
    /// Derive both subkeys from the pickle key.
    pub(crate) fn derive(pickle_key: &[u8; 32]) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, pickle_key);

        let mut cipher_key = [0u8; 32];
        let mut nonce_key = [0u8; 32];
        let Ok(()) = hkdf.expand(CIPHER_KEY_LABEL, &mut cipher_key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };
        let Ok(()) = hkdf.expand(NONCE_KEY_LABEL, &mut nonce_key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };

        Self { cipher_key, nonce_key }
    }

    pub(crate) fn cipher_key(&self) -> &[u8; 32] {
        &self.cipher_key
    }

    /// Synthetic nonce: `HMAC(nonce_key, header | body)` truncated to 24 bytes.
    ///
    /// Equal inputs give equal blobs; different bodies give different nonces.
    pub(crate) fn synthetic_nonce(&self, header: &[u8], body: &[u8]) -> [u8; NONCE_SIZE] {
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&self.nonce_key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(header);
        mac.update(body);
        let result = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&result[..NONCE_SIZE]);
        nonce
    }
}

impl Drop for PickleKeys {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.nonce_key.zeroize();
    }
}
