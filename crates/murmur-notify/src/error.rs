//! Error types for the notification shim.

use murmur_crypto::{ErrorKind, SessionError};
use thiserror::Error;

/// Errors from secret and pickle stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// I/O error from the backing database or filesystem
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored value could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Account name cannot be mapped to a storage location
    #[error("invalid account name: {account:?}")]
    InvalidAccount {
        /// Rejected account name
        account: String,
    },

    /// A lock guarding in-memory state was poisoned
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors from decrypting a notification.
///
/// Display strings never contain key bytes or plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// No pickle key stored under the configured account
    #[error("no pickle key stored for account {account:?}")]
    MissingPickleKey {
        /// Account that was queried
        account: String,
    },

    /// Stored pickle key is neither base64 of 32 bytes nor 32 raw bytes
    #[error("stored pickle key is not 32 bytes (got {len} bytes)")]
    InvalidPickleKey {
        /// Length of the stored secret
        len: usize,
    },

    /// No pickle stored for the session
    #[error("no session pickle for session {session_id:?}")]
    SessionNotFound {
        /// Session that was queried
        session_id: String,
    },

    /// Store backend failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Session rejected the pickle or the ciphertext
    #[error("decrypt failed: {0}")]
    Decrypt(#[from] SessionError),
}

impl NotifyError {
    /// Session error kind, if the failure came from decryption.
    pub fn session_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Decrypt(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Short stable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingPickleKey { .. } => "MissingPickleKey",
            Self::InvalidPickleKey { .. } => "InvalidPickleKey",
            Self::SessionNotFound { .. } => "SessionNotFound",
            Self::Store(_) => "Store",
            Self::Decrypt(err) => err.kind().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypt_errors_keep_their_kind() {
        let err = NotifyError::from(SessionError::CorruptPickle { reason: "bad header" });
        assert_eq!(err.session_kind(), Some(ErrorKind::CorruptPickle));
        assert_eq!(err.label(), "CorruptPickle");
    }

    #[test]
    fn store_errors_have_no_session_kind() {
        let err = NotifyError::from(StoreError::Io("disk full".to_string()));
        assert_eq!(err.session_kind(), None);
        assert_eq!(err.to_string(), "store error: I/O error: disk full");
    }
}
