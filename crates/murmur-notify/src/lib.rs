//! Notification-extension shim for Murmur group sessions.
//!
//! Glues the session decryptor to its collaborators: a credential store for
//! the pickle key, a persistence layer for session pickles and a JSON parser
//! for the decrypted event. The flow lives in [`NotificationDecryptor`].
//!
//! # Components
//!
//! - [`store`]: [`SecretStore`] and [`PickleStore`] traits with in-memory,
//!   file and Redb implementations
//! - [`payload`]: `content.body` extraction
//! - [`NotifyConfig`]: paths, key account and persistence switch

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod decryptor;
mod error;
pub mod payload;
pub mod store;

pub use config::{DEFAULT_PICKLE_KEY_ACCOUNT, NotifyConfig};
pub use decryptor::{DecryptedNotification, NotificationDecryptor};
pub use error::{NotifyError, StoreError};
pub use store::{
    FileSecretStore, MemoryStore, PickleStore, RedbPickleStore, SecretStore, normalize_pickle_key,
};
