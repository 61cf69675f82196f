//! Per-session ratchet policy

use serde::{Deserialize, Serialize};

/// Maximum number of indices the chain may skip forward in one resolve.
///
/// Bounds the work a single hostile message index can cause.
pub const DEFAULT_MAX_SKIP: u32 = 1000;

/// Maximum number of derived links kept for out-of-order delivery.
pub const DEFAULT_MAX_CACHED_LINKS: u32 = 1000;

/// What happens to a message key after it has decrypted a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPolicy {
    /// Keep the key so the same index can be decrypted again.
    #[default]
    Cache,
    /// Drop the key after first use; a second decrypt of the index is a
    /// replay.
    PurgeAfterUse,
}

/// Ratchet policy persisted alongside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Largest forward skip allowed past the chain head
    pub max_skip: u32,
    /// Largest number of cached links; lowest indices are evicted first
    pub max_cached_links: u32,
    /// Consumed-key policy
    pub key_policy: KeyPolicy,
}

impl SessionConfig {
    /// Config that purges each message key after its first successful use.
    pub fn purge_after_use() -> Self {
        Self { key_policy: KeyPolicy::PurgeAfterUse, ..Self::default() }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_skip: DEFAULT_MAX_SKIP,
            max_cached_links: DEFAULT_MAX_CACHED_LINKS,
            key_policy: KeyPolicy::Cache,
        }
    }
}
