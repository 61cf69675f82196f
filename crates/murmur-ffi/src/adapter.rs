//! Safe decrypt entry point behind the C ABI.
//!
//! Validates text inputs, runs one session decrypt and hands back plaintext
//! plus the advanced pickle. Every failure is a [`SessionError`]; its
//! [`ErrorKind`](murmur_crypto::ErrorKind) is what crosses the boundary.

use murmur_crypto::{
    GroupMessage, InboundGroupSession, SessionError, SessionPickle, decode_base64,
    pickle_key_array,
};
use zeroize::Zeroize;

/// Result of a successful [`decrypt_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedEvent {
    /// Decrypted payload as UTF-8 text with no interior NUL
    pub plaintext: String,
    /// Ratchet index of the decrypted message
    pub message_index: u32,
    /// Session pickle after the decrypt, to be stored by the caller
    pub updated_pickle: String,
}

/// Decrypt one ciphertext with a pickled inbound group session.
///
/// Both texts are base64-decoded before the key is looked at, so malformed
/// input is reported as `InvalidEncoding` whatever the key. The pickle is
/// then opened before the message bytes are parsed, so a wrong key is
/// `CorruptPickle` for any base64 ciphertext. The pickle key is copied into
/// a zeroizing buffer and the session is dropped before returning; nothing
/// outlives the call except the returned texts.
///
/// # Errors
///
/// - `InvalidEncoding`: pickle or ciphertext is not base64, or the plaintext
///   is not UTF-8 text without NUL bytes
/// - `InvalidKeyLength`: key is not 32 bytes
/// - any session error from unpickling, parsing or decrypting
pub fn decrypt_event(
    pickle: &str,
    pickle_key: &[u8],
    ciphertext: &str,
) -> Result<DecryptedEvent, SessionError> {
    let pickle_bytes = decode_base64(pickle, "pickle")?;
    let message_bytes = decode_base64(ciphertext, "ciphertext")?;

    let pickle_key = pickle_key_array(pickle_key)?;
    let unpickled = SessionPickle::open(&pickle_bytes, &pickle_key)?;
    let mut session = InboundGroupSession::try_from(&unpickled)?;

    let message = GroupMessage::from_bytes(&message_bytes)?;
    let decrypted = session.decrypt(&message)?;

    let mut plaintext = match String::from_utf8(decrypted.plaintext) {
        Ok(text) => text,
        Err(err) => {
            err.into_bytes().zeroize();
            return Err(SessionError::InvalidEncoding {
                reason: "plaintext is not UTF-8".to_string(),
            });
        },
    };
    if plaintext.contains('\0') {
        plaintext.zeroize();
        return Err(SessionError::InvalidEncoding {
            reason: "plaintext contains a NUL byte".to_string(),
        });
    }

    Ok(DecryptedEvent {
        plaintext,
        message_index: decrypted.message_index,
        updated_pickle: session.pickle_encrypted(&pickle_key),
    })
}
