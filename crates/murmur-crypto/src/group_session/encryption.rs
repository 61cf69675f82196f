//! Message decryption using `XChaCha20-Poly1305`
//!
//! All functions are pure. Nonces are supplied by the caller.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use super::{
    error::SessionError,
    message::{GroupMessage, NONCE_SIZE, TAG_SIZE},
    ratchet::MessageKey,
};

/// Seal `plaintext` under a message key.
///
/// Returns ciphertext with the 16-byte Poly1305 tag appended. The caller must
/// never reuse a `(message_key, nonce)` pair.
pub fn encrypt_message(
    plaintext: &[u8],
    message_key: &MessageKey,
    nonce: &[u8; NONCE_SIZE],
    associated_data: &[u8],
) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(message_key.key().into());
    let payload = Payload { msg: plaintext, aad: associated_data };

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(nonce), payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };
    ciphertext
}

/// Decrypt a group message with its message key.
///
/// The tag is verified before any plaintext is produced; on failure no
/// plaintext bytes are returned.
///
/// # Errors
///
/// - `MalformedCiphertext`: ciphertext is shorter than the tag
/// - `AuthenticationFailed`: key index does not match the message, or the tag
///   does not verify (wrong key or tampering)
pub fn decrypt_message(
    message: &GroupMessage,
    message_key: &MessageKey,
) -> Result<Vec<u8>, SessionError> {
    if message.ciphertext.len() < TAG_SIZE {
        return Err(SessionError::MalformedCiphertext { reason: "missing authentication tag" });
    }

    if message_key.index() != message.message_index {
        return Err(SessionError::AuthenticationFailed { reason: "message key index mismatch" });
    }

    let cipher = XChaCha20Poly1305::new(message_key.key().into());
    let aad = message.associated_data();
    let payload = Payload { msg: message.ciphertext.as_slice(), aad: &aad };

    cipher
        .decrypt(XNonce::from_slice(&message.nonce), payload)
        .map_err(|_| SessionError::AuthenticationFailed { reason: "authentication tag mismatch" })
}
