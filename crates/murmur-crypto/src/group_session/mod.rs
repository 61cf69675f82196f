//! Inbound group sessions: receive-side decryption for group messages
//!
//! A sender distributes a chain key and its Ed25519 public key once; every
//! message it sends carries the ratchet index, an AEAD ciphertext and a
//! signature. The receiver keeps the chain and derives keys on demand.
//!
//! # Architecture
//!
//! ```text
//! Encrypted pickle + pickle key
//!        │
//!        ▼ Pickle codec (HKDF subkeys, XChaCha20-Poly1305, CBOR)
//! InboundGroupSession { signing key, RatchetChain }
//!        │
//!        ▼ resolve_key(index)
//! MessageKey[index]
//!        │
//!        ▼ verify signature, then AEAD open
//! Plaintext
//! ```
//!
//! # Security Properties
//!
//! - Fail Closed: pickles and messages that do not authenticate yield no data
//! - Replay Control: consumed indices are cached or purged per
//!   [`KeyPolicy`]
//! - Bounded Work: forward skips are capped per session
//! - Sender Authentication: every message is signed by the session's sender

pub mod config;
mod derivation;
mod encoding;
pub mod encryption;
pub mod error;
pub mod message;
pub mod pickle;
pub mod ratchet;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{DEFAULT_MAX_CACHED_LINKS, DEFAULT_MAX_SKIP, KeyPolicy, SessionConfig};
pub use encoding::decode as decode_base64;
pub use encryption::{decrypt_message, encrypt_message};
pub use error::{ErrorKind, SessionError};
pub use message::GroupMessage;
pub use pickle::{PICKLE_KEY_SIZE, PICKLE_VERSION, SessionPickle, pickle_key_array};
pub use ratchet::{MessageKey, RatchetChain, SymmetricRatchet};
pub use session::{DecryptedMessage, InboundGroupSession, SESSION_KEY_VERSION, SessionKey};
