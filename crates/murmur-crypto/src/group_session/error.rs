//! Error types for inbound group session operations

use std::fmt;

use thiserror::Error;

/// Stable classification of session failures.
///
/// The numeric codes cross the C ABI and must never be renumbered.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Pickle key was not exactly 32 bytes
    InvalidKeyLength = 1,
    /// Pickle header, tag or body did not verify
    CorruptPickle = 2,
    /// Pickle names a format version this build does not know
    UnsupportedVersion = 3,
    /// Message index is behind the chain head and its key is gone
    ReplayOrExpiredIndex = 4,
    /// Message index is further ahead than the configured skip bound
    IndexSkipTooLarge = 5,
    /// Signature or AEAD tag did not verify
    AuthenticationFailed = 6,
    /// Ciphertext is structurally invalid
    MalformedCiphertext = 7,
    /// An input or output could not be encoded or decoded as text
    InvalidEncoding = 8,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 8] = [
        Self::InvalidKeyLength,
        Self::CorruptPickle,
        Self::UnsupportedVersion,
        Self::ReplayOrExpiredIndex,
        Self::IndexSkipTooLarge,
        Self::AuthenticationFailed,
        Self::MalformedCiphertext,
        Self::InvalidEncoding,
    ];

    /// Numeric code used at the C boundary.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Kind for a numeric code, `None` for 0 and unknown codes.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Stable identifier, suitable for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKeyLength => "InvalidKeyLength",
            Self::CorruptPickle => "CorruptPickle",
            Self::UnsupportedVersion => "UnsupportedVersion",
            Self::ReplayOrExpiredIndex => "ReplayOrExpiredIndex",
            Self::IndexSkipTooLarge => "IndexSkipTooLarge",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::MalformedCiphertext => "MalformedCiphertext",
            Self::InvalidEncoding => "InvalidEncoding",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from inbound group session operations.
///
/// Messages never contain key material or plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Key material has the wrong length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required key length
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Pickle could not be authenticated or decoded
    #[error("corrupt pickle: {reason}")]
    CorruptPickle {
        /// Which check failed
        reason: &'static str,
    },

    /// Pickle header carries an unknown version
    #[error("unsupported pickle version {version}")]
    UnsupportedVersion {
        /// Version byte found in the header
        version: u8,
    },

    /// Requested index was already consumed, evicted, or predates the session
    #[error("message index {requested} is replayed or expired (chain head {head})")]
    ReplayOrExpiredIndex {
        /// Requested message index
        requested: u32,
        /// Chain head at the time of the request
        head: u32,
    },

    /// Requested index is too far ahead of the chain head
    #[error("message index {requested} is too far ahead of chain head {head} (max skip {max_skip})")]
    IndexSkipTooLarge {
        /// Requested message index
        requested: u32,
        /// Chain head at the time of the request
        head: u32,
        /// Configured skip bound
        max_skip: u32,
    },

    /// Signature or authentication tag mismatch
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Which check failed
        reason: &'static str,
    },

    /// Ciphertext is too short or structurally invalid
    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext {
        /// What was wrong with the ciphertext
        reason: &'static str,
    },

    /// Text input or output could not be encoded or decoded
    #[error("invalid encoding: {reason}")]
    InvalidEncoding {
        /// What could not be encoded or decoded
        reason: String,
    },
}

impl SessionError {
    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKeyLength { .. } => ErrorKind::InvalidKeyLength,
            Self::CorruptPickle { .. } => ErrorKind::CorruptPickle,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::ReplayOrExpiredIndex { .. } => ErrorKind::ReplayOrExpiredIndex,
            Self::IndexSkipTooLarge { .. } => ErrorKind::IndexSkipTooLarge,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::MalformedCiphertext { .. } => ErrorKind::MalformedCiphertext,
            Self::InvalidEncoding { .. } => ErrorKind::InvalidEncoding,
        }
    }

    /// Returns true if the caller supplied bad input.
    ///
    /// Input errors can be fixed by the caller. Everything else means the key
    /// is wrong, the data is corrupted, or the message was rejected.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InvalidKeyLength { .. } => true,
            Self::InvalidEncoding { .. } => true,
            Self::MalformedCiphertext { .. } => true,

            Self::CorruptPickle { .. } => false,
            Self::UnsupportedVersion { .. } => false,
            Self::ReplayOrExpiredIndex { .. } => false,
            Self::IndexSkipTooLarge { .. } => false,
            Self::AuthenticationFailed { .. } => false,
        }
    }
}
