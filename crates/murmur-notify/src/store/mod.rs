//! Collaborator stores for the notification shim
//!
//! The decryptor reads the pickle key from a [`SecretStore`] and session
//! pickles from a [`PickleStore`]. Both traits are synchronous, matching the
//! one-shot notification-extension lifecycle.

mod file;
mod memory;
mod redb;

use base64::{Engine, engine::general_purpose::STANDARD};
pub use file::FileSecretStore;
pub use memory::MemoryStore;
use murmur_crypto::PICKLE_KEY_SIZE;
use zeroize::Zeroizing;

pub use self::redb::RedbPickleStore;
use crate::error::{NotifyError, StoreError};

/// Credential store holding the pickle key.
pub trait SecretStore {
    /// Secret bytes stored under `account`, `None` if absent.
    fn get_secret(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError>;
}

/// Persistence layer for encrypted session pickles.
pub trait PickleStore {
    /// Pickle text for `session_id`, `None` if the session is unknown.
    fn lookup_pickle(&self, session_id: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the pickle for `session_id`.
    fn store_pickle(&self, session_id: &str, pickle: &str) -> Result<(), StoreError>;
}

/// Turn a stored secret into a 32-byte pickle key.
///
/// Accepts base64 text that decodes to 32 bytes, or exactly 32 raw bytes.
/// Base64 wins when both readings are possible.
///
/// # Errors
///
/// - `InvalidPickleKey` if neither reading yields 32 bytes
pub fn normalize_pickle_key(
    secret: &[u8],
) -> Result<Zeroizing<[u8; PICKLE_KEY_SIZE]>, NotifyError> {
    let decoded = std::str::from_utf8(secret)
        .ok()
        .and_then(|text| STANDARD.decode(text.trim()).ok())
        .map(Zeroizing::new);

    let bytes: &[u8] = match &decoded {
        Some(decoded) if decoded.len() == PICKLE_KEY_SIZE => decoded.as_slice(),
        _ if secret.len() == PICKLE_KEY_SIZE => secret,
        _ => return Err(NotifyError::InvalidPickleKey { len: secret.len() }),
    };

    let mut key = Zeroizing::new([0u8; PICKLE_KEY_SIZE]);
    key.copy_from_slice(bytes);
    Ok(key)
}
