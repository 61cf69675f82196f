//! Murmur Cryptographic Core
//!
//! Receive-side decryption for group messaging sessions, built to run inside
//! short-lived processes such as push notification extensions. Pure functions
//! with deterministic outputs; no I/O, no clock, no randomness.
//!
//! # Key Lifecycle
//!
//! The session state persists between processes as an encrypted pickle. Each
//! decrypt call restores the session, resolves the message key for the
//! message's ratchet index and authenticates the ciphertext. The advanced
//! session is pickled again for the caller to store.
//!
//! ```text
//! Pickle Key (32 bytes, caller-held)
//!        │
//!        ▼
//! HKDF → Pickle cipher key + nonce key
//!        │
//!        ▼
//! Decrypt pickle → Session { Chain Key[head], cached links }
//!        │
//!        ▼
//! Symmetric Ratchet → Message Key[index]
//!        │
//!        ▼
//! Ed25519 verify + AEAD open → Plaintext
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Chain keys are zeroized as soon as the next one is derived
//! - Pickle keys, chain keys and message keys are zeroized on drop
//!
//! Authenticity:
//! - Ed25519 signature binds each message to the session's sender
//! - XChaCha20-Poly1305 tag binds the ciphertext to its index
//! - Failed verification -> reject, no plaintext released
//!
//! Replay and Resource Bounds:
//! - Indices behind the head come only from the bounded link cache
//! - Forward skips larger than the configured bound are rejected before any
//!   derivation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod group_session;

pub use group_session::{
    DEFAULT_MAX_CACHED_LINKS, DEFAULT_MAX_SKIP, DecryptedMessage, ErrorKind, GroupMessage,
    InboundGroupSession, KeyPolicy, MessageKey, PICKLE_KEY_SIZE, PICKLE_VERSION, RatchetChain,
    SESSION_KEY_VERSION, SessionConfig, SessionError, SessionKey, SessionPickle,
    SymmetricRatchet, decode_base64, decrypt_message, encrypt_message, pickle_key_array,
};
#[cfg(any(test, feature = "test-utils"))]
pub use group_session::testing::TestSender;
