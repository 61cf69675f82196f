//! Group message wire format
//!
//! ```text
//! version:u8 | message_index:u32 BE | nonce:[u8; 24] | ciphertext+tag | signature:[u8; 64]
//! ```
//!
//! The AEAD associated data is `version | message_index`. The Ed25519
//! signature covers every byte before it.

use ed25519_dalek::{Signature, VerifyingKey};

use super::{encoding, error::SessionError};

/// Current group message version
pub const MESSAGE_VERSION: u8 = 0x01;

/// Size of the `XChaCha20` nonce (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Ed25519 signature size (64 bytes)
pub const SIGNATURE_SIZE: usize = 64;

/// version + message index
const HEADER_SIZE: usize = 1 + 4;

/// Shortest valid message: header, nonce, empty plaintext tag, signature
pub const MIN_MESSAGE_SIZE: usize = HEADER_SIZE + NONCE_SIZE + TAG_SIZE + SIGNATURE_SIZE;

/// A signed, encrypted group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMessage {
    /// Ratchet index the message was encrypted at
    pub message_index: u32,
    /// The 24-byte `XChaCha20` nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
    /// Ed25519 signature by the session's sender
    pub signature: [u8; SIGNATURE_SIZE],
}

impl GroupMessage {
    /// Parse a message from raw bytes.
    ///
    /// # Errors
    ///
    /// - `MalformedCiphertext` if the message is truncated or has an unknown
    ///   version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        if bytes.len() < MIN_MESSAGE_SIZE {
            return Err(SessionError::MalformedCiphertext { reason: "message too short" });
        }
        if bytes[0] != MESSAGE_VERSION {
            return Err(SessionError::MalformedCiphertext { reason: "unknown message version" });
        }

        let mut index = [0u8; 4];
        index.copy_from_slice(&bytes[1..HEADER_SIZE]);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + NONCE_SIZE]);

        let signature_start = bytes.len() - SIGNATURE_SIZE;
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature.copy_from_slice(&bytes[signature_start..]);

        Ok(Self {
            message_index: u32::from_be_bytes(index),
            nonce,
            ciphertext: bytes[HEADER_SIZE + NONCE_SIZE..signature_start].to_vec(),
            signature,
        })
    }

    /// Parse a message from its base64 text form.
    ///
    /// # Errors
    ///
    /// - `InvalidEncoding` if the text is not base64
    /// - `MalformedCiphertext` as for [`from_bytes`](Self::from_bytes)
    pub fn from_base64(text: &str) -> Result<Self, SessionError> {
        let bytes = encoding::decode(text, "ciphertext")?;
        Self::from_bytes(&bytes)
    }

    /// Serialize to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signed_bytes();
        bytes.extend_from_slice(&self.signature);
        bytes
    }

    /// Serialize to base64 text.
    pub fn to_base64(&self) -> String {
        encoding::encode(&self.to_bytes())
    }

    /// Associated data bound into the AEAD tag.
    pub fn associated_data(&self) -> [u8; HEADER_SIZE] {
        let mut aad = [0u8; HEADER_SIZE];
        aad[0] = MESSAGE_VERSION;
        aad[1..].copy_from_slice(&self.message_index.to_be_bytes());
        aad
    }

    /// Bytes covered by the signature.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes =
            Vec::with_capacity(HEADER_SIZE + NONCE_SIZE + self.ciphertext.len() + SIGNATURE_SIZE);
        bytes.extend_from_slice(&self.associated_data());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Verify the sender's signature.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` if the signature does not verify under `key`
    pub fn verify(&self, key: &VerifyingKey) -> Result<(), SessionError> {
        let signature = Signature::from_bytes(&self.signature);
        key.verify_strict(&self.signed_bytes(), &signature)
            .map_err(|_| SessionError::AuthenticationFailed { reason: "signature mismatch" })
    }
}
