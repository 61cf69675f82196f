//! Encrypted, versioned session pickles
//!
//! ```text
//! text   = base64(bytes)
//! bytes  = magic "MRMP" | version:u8 | nonce:[u8; 24] | sealed
//! sealed = XChaCha20-Poly1305(cipher_key, nonce, aad = magic | version, CBOR(SessionPickle))
//! nonce  = HMAC-SHA256(nonce_key, magic | version | CBOR body)[..24]
//! ```
//!
//! `cipher_key` and `nonce_key` are HKDF subkeys of the caller's 32-byte
//! pickle key. The synthetic nonce makes pickling a pure function of the
//! session and the key.
//!
//! # Security
//!
//! - Fail Closed: wrong key, truncation and bit flips all fail the Poly1305
//!   check (constant-time) before the body is parsed
//! - Strict Versioning: unknown versions are rejected, never guessed

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::{
    config::SessionConfig,
    derivation::PickleKeys,
    encoding,
    error::SessionError,
    message::{NONCE_SIZE, TAG_SIZE},
};

/// Magic bytes identifying a pickle: "MRMP" in ASCII
pub const PICKLE_MAGIC: [u8; 4] = *b"MRMP";

/// Current pickle format version
pub const PICKLE_VERSION: u8 = 0x01;

/// Required pickle key length
pub const PICKLE_KEY_SIZE: usize = 32;

const HEADER_SIZE: usize = PICKLE_MAGIC.len() + 1;

/// A derived link as stored in a pickle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickledLink {
    /// Message index of the link
    pub index: u32,
    /// Message key bytes
    pub key: [u8; 32],
}

/// Plain-data snapshot of an inbound group session.
///
/// Produced by [`InboundGroupSession::pickle`](super::InboundGroupSession::pickle)
/// and turned back into a session with `TryFrom`. Key bytes are zeroed on
/// drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPickle {
    /// Ed25519 public key of the sender
    pub signing_key: [u8; 32],
    /// Chain key for `chain_index`
    pub chain_key: [u8; 32],
    /// Next index the chain would derive
    pub chain_index: u32,
    /// Lowest index the session can decrypt
    pub first_known_index: u32,
    /// Chain key for `first_known_index`, kept for exports
    pub first_chain_key: [u8; 32],
    /// Cached links, ascending by index
    pub links: Vec<PickledLink>,
    /// Session creation time (Unix seconds)
    pub created_at: u64,
    /// Ratchet policy
    pub config: SessionConfig,
}

impl SessionPickle {
    /// Encrypt into the binary pickle format.
    pub fn seal(&self, pickle_key: &[u8; PICKLE_KEY_SIZE]) -> Vec<u8> {
        let keys = PickleKeys::derive(pickle_key);
        let header = header();

        let mut body = Zeroizing::new(Vec::new());
        let Ok(()) = ciborium::into_writer(self, &mut *body) else {
            unreachable!("CBOR serialization into a Vec cannot fail");
        };

        let nonce = keys.synthetic_nonce(&header, &body);
        let cipher = XChaCha20Poly1305::new(keys.cipher_key().into());
        let payload = Payload { msg: body.as_slice(), aad: &header };
        let Ok(sealed) = cipher.encrypt(XNonce::from_slice(&nonce), payload) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        let mut out = Vec::with_capacity(HEADER_SIZE + NONCE_SIZE + sealed.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        out
    }

    /// Decrypt a binary pickle.
    ///
    /// # Errors
    ///
    /// - `CorruptPickle`: bad magic, truncation, tag mismatch or undecodable
    ///   body
    /// - `UnsupportedVersion`: well-formed header with an unknown version
    pub fn open(bytes: &[u8], pickle_key: &[u8; PICKLE_KEY_SIZE]) -> Result<Self, SessionError> {
        if bytes.len() < HEADER_SIZE || bytes[..PICKLE_MAGIC.len()] != PICKLE_MAGIC {
            return Err(SessionError::CorruptPickle { reason: "bad header" });
        }

        let version = bytes[PICKLE_MAGIC.len()];
        if version != PICKLE_VERSION {
            return Err(SessionError::UnsupportedVersion { version });
        }

        if bytes.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
            return Err(SessionError::CorruptPickle { reason: "truncated" });
        }

        let keys = PickleKeys::derive(pickle_key);
        let (header, rest) = bytes.split_at(HEADER_SIZE);
        let (nonce, sealed) = rest.split_at(NONCE_SIZE);

        let cipher = XChaCha20Poly1305::new(keys.cipher_key().into());
        let payload = Payload { msg: sealed, aad: header };
        let body = cipher
            .decrypt(XNonce::from_slice(nonce), payload)
            .map(Zeroizing::new)
            .map_err(|_| SessionError::CorruptPickle { reason: "authentication tag mismatch" })?;

        ciborium::from_reader(body.as_slice())
            .map_err(|_| SessionError::CorruptPickle { reason: "undecodable body" })
    }

    /// Encrypt into the base64 text form.
    pub fn encrypt(&self, pickle_key: &[u8; PICKLE_KEY_SIZE]) -> String {
        encoding::encode(&self.seal(pickle_key))
    }

    /// Decrypt from the base64 text form.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`: `pickle_key` is not 32 bytes
    /// - `InvalidEncoding`: `text` is not base64
    /// - everything [`open`](Self::open) returns
    pub fn from_encrypted(text: &str, pickle_key: &[u8]) -> Result<Self, SessionError> {
        let pickle_key = pickle_key_array(pickle_key)?;
        let bytes = encoding::decode(text, "pickle")?;
        Self::open(&bytes, &pickle_key)
    }
}

impl Drop for SessionPickle {
    fn drop(&mut self) {
        self.chain_key.zeroize();
        self.first_chain_key.zeroize();
        for link in &mut self.links {
            link.key.zeroize();
        }
    }
}

/// Copy a pickle key slice into a fixed array, checking its length.
///
/// # Errors
///
/// - `InvalidKeyLength` if `key` is not exactly 32 bytes
pub fn pickle_key_array(key: &[u8]) -> Result<Zeroizing<[u8; PICKLE_KEY_SIZE]>, SessionError> {
    if key.len() != PICKLE_KEY_SIZE {
        return Err(SessionError::InvalidKeyLength {
            expected: PICKLE_KEY_SIZE,
            actual: key.len(),
        });
    }

    let mut array = Zeroizing::new([0u8; PICKLE_KEY_SIZE]);
    array.copy_from_slice(key);
    Ok(array)
}

fn header() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..PICKLE_MAGIC.len()].copy_from_slice(&PICKLE_MAGIC);
    header[PICKLE_MAGIC.len()] = PICKLE_VERSION;
    header
}
