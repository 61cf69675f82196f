//! Message-key ratchet for inbound group sessions
//!
//! # Security Properties
//!
//! - Forward Secrecy: Old chain keys are overwritten when advancing
//! - Key Uniqueness: Each index produces a unique message key
//! - Determinism: Same chain key always produces same key sequence
//! - Bounded Work: Forward skips are capped by [`SessionConfig::max_skip`]

use std::{collections::BTreeMap, fmt};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use super::{
    config::{KeyPolicy, SessionConfig},
    error::SessionError,
};

type HmacSha256 = Hmac<Sha256>;

/// Label for deriving the next chain key
const CHAIN_LABEL: &[u8] = b"chain";

/// Label for deriving a message key
const MESSAGE_LABEL: &[u8] = b"message";

/// A message key bound to a message index.
///
/// Used to decrypt exactly the message carrying the same index.
#[derive(Clone)]
pub struct MessageKey {
    /// The 32-byte symmetric key for XChaCha20-Poly1305
    key: [u8; 32],
    /// The message index this key was derived for
    index: u32,
}

impl MessageKey {
    pub(crate) fn from_parts(key: [u8; 32], index: u32) -> Self {
        Self { key, index }
    }

    /// 32-byte symmetric key for XChaCha20-Poly1305 AEAD.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Message index this key was derived for.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageKey").field("index", &self.index).finish_non_exhaustive()
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Forward-secure symmetric ratchet.
///
/// Each [`advance()`](Self::advance) call:
/// 1. Derives a message key from the current chain key
/// 2. Derives the next chain key
/// 3. Overwrites the old chain key (forward secrecy)
#[derive(Clone)]
pub struct SymmetricRatchet {
    /// Current chain key (32 bytes)
    chain_key: [u8; 32],
    /// Index of the next message key this ratchet will produce
    index: u32,
}

impl SymmetricRatchet {
    /// Create a ratchet whose chain key belongs to `index`.
    pub fn new(chain_key: &[u8; 32], index: u32) -> Self {
        Self { chain_key: *chain_key, index }
    }

    /// Index of the next message key.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn chain_key(&self) -> &[u8; 32] {
        &self.chain_key
    }

    /// Advance the ratchet and derive the message key for the current index.
    pub fn advance(&mut self) -> Result<MessageKey, SessionError> {
        if self.index == u32::MAX {
            return Err(SessionError::IndexSkipTooLarge {
                requested: self.index,
                head: self.index,
                max_skip: 0,
            });
        }

        let message_key = hmac_label(&self.chain_key, MESSAGE_LABEL);
        let next_chain_key = hmac_label(&self.chain_key, CHAIN_LABEL);

        // Zeroize and replace the old chain key for forward secrecy
        self.chain_key.zeroize();
        self.chain_key = next_chain_key;

        let current = self.index;
        self.index += 1;

        Ok(MessageKey { key: message_key, index: current })
    }
}

impl Drop for SymmetricRatchet {
    fn drop(&mut self) {
        self.chain_key.zeroize();
    }
}

fn hmac_label(chain_key: &[u8; 32], label: &[u8]) -> [u8; 32] {
    let Ok(mut mac) = HmacSha256::new_from_slice(chain_key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(label);
    let result = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    key.copy_from_slice(&result);
    key
}

/// Inbound ratchet chain with a bounded cache of derived links.
///
/// # Invariants
///
/// - The head (next underived index) only moves forward
/// - Every cached link index is below the head and at or above
///   `first_known_index`
/// - At most `config.max_cached_links` links are cached
/// - The initial ratchet never moves; it is what exports derive from
#[derive(Clone)]
pub struct RatchetChain {
    initial: SymmetricRatchet,
    ratchet: SymmetricRatchet,
    links: BTreeMap<u32, MessageKey>,
    config: SessionConfig,
}

impl RatchetChain {
    /// Start a chain at the ratchet's current index.
    pub fn new(ratchet: SymmetricRatchet, config: SessionConfig) -> Self {
        Self { initial: ratchet.clone(), ratchet, links: BTreeMap::new(), config }
    }

    /// Rebuild a chain from persisted parts, rejecting inconsistent state.
    pub(crate) fn from_parts(
        initial: SymmetricRatchet,
        ratchet: SymmetricRatchet,
        links: impl IntoIterator<Item = MessageKey>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let first_known_index = initial.index();
        if first_known_index > ratchet.index() {
            return Err(SessionError::CorruptPickle { reason: "first index beyond chain head" });
        }

        let mut map = BTreeMap::new();
        for link in links {
            if link.index() < first_known_index || link.index() >= ratchet.index() {
                return Err(SessionError::CorruptPickle { reason: "cached link out of range" });
            }
            if map.insert(link.index(), link).is_some() {
                return Err(SessionError::CorruptPickle { reason: "duplicate cached link" });
            }
        }
        if map.len() > config.max_cached_links as usize {
            return Err(SessionError::CorruptPickle { reason: "too many cached links" });
        }

        Ok(Self { initial, ratchet, links: map, config })
    }

    /// Index of the next link the chain would derive.
    pub fn head(&self) -> u32 {
        self.ratchet.index()
    }

    /// Lowest index this chain could ever decrypt.
    pub fn first_known_index(&self) -> u32 {
        self.initial.index()
    }

    /// Ratchet policy of this chain.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Indices of the cached links in ascending order.
    pub fn cached_indices(&self) -> Vec<u32> {
        self.links.keys().copied().collect()
    }

    pub(crate) fn ratchet(&self) -> &SymmetricRatchet {
        &self.ratchet
    }

    pub(crate) fn initial(&self) -> &SymmetricRatchet {
        &self.initial
    }

    pub(crate) fn links(&self) -> impl Iterator<Item = &MessageKey> {
        self.links.values()
    }

    /// Resolve the message key for `index`.
    ///
    /// Indices behind the head are served from the cache. Indices at or past
    /// the head derive every link up to and including `index`.
    ///
    /// # Errors
    ///
    /// - `ReplayOrExpiredIndex`: index is behind the head and not cached
    /// - `IndexSkipTooLarge`: index is more than `max_skip` past the head; the
    ///   chain is left untouched
    pub fn resolve_key(&mut self, index: u32) -> Result<MessageKey, SessionError> {
        let head = self.head();

        if index < head {
            let cached = match self.config.key_policy {
                KeyPolicy::Cache => self.links.get(&index).cloned(),
                KeyPolicy::PurgeAfterUse => self.links.remove(&index),
            };
            return cached.ok_or(SessionError::ReplayOrExpiredIndex { requested: index, head });
        }

        // index >= head, so this won't underflow
        let skip = index - head;
        if skip > self.config.max_skip || index == u32::MAX {
            return Err(SessionError::IndexSkipTooLarge {
                requested: index,
                head,
                max_skip: self.config.max_skip,
            });
        }

        let mut target = None;
        while self.ratchet.index() <= index {
            let link = self.ratchet.advance()?;
            if link.index() == index {
                target = Some(link);
            } else {
                self.links.insert(link.index(), link);
            }
        }

        let target = target.ok_or(SessionError::ReplayOrExpiredIndex { requested: index, head })?;
        if self.config.key_policy == KeyPolicy::Cache {
            self.links.insert(index, target.clone());
        }
        self.evict();

        Ok(target)
    }

    /// Ratchet positioned at `index`, for handing the chain on to another
    /// receiver. Leaves this chain untouched.
    ///
    /// Returns `None` for indices before `first_known_index` and for indices
    /// more than `max_skip` past the head.
    pub fn export_at(&self, index: u32) -> Option<SymmetricRatchet> {
        let mut exported = if index >= self.head() {
            if index - self.head() > self.config.max_skip {
                return None;
            }
            self.ratchet.clone()
        } else if index >= self.first_known_index() {
            self.initial.clone()
        } else {
            return None;
        };

        while exported.index() < index {
            exported.advance().ok()?;
        }
        Some(exported)
    }

    /// Drop the lowest cached links until the cache fits its bound.
    fn evict(&mut self) {
        while self.links.len() > self.config.max_cached_links as usize {
            self.links.pop_first();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_seed() -> [u8; 32] {
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = i as u8;
        }
        seed
    }

    fn chain_at(index: u32, config: SessionConfig) -> RatchetChain {
        RatchetChain::new(SymmetricRatchet::new(&test_seed(), index), config)
    }

    #[test]
    fn advance_increments_index() {
        let mut ratchet = SymmetricRatchet::new(&test_seed(), 0);

        let key0 = ratchet.advance().unwrap();
        assert_eq!(key0.index(), 0);
        assert_eq!(ratchet.index(), 1);

        let key1 = ratchet.advance().unwrap();
        assert_eq!(key1.index(), 1);
        assert_eq!(ratchet.index(), 2);
    }

    #[test]
    fn advance_produces_unique_keys() {
        let mut ratchet = SymmetricRatchet::new(&test_seed(), 0);

        let key0 = ratchet.advance().unwrap();
        let key1 = ratchet.advance().unwrap();
        let key2 = ratchet.advance().unwrap();

        assert_ne!(key0.key(), key1.key(), "keys must be unique");
        assert_ne!(key1.key(), key2.key(), "keys must be unique");
        assert_ne!(key0.key(), key2.key(), "keys must be unique");
    }

    #[test]
    fn ratchet_is_deterministic() {
        let mut ratchet1 = SymmetricRatchet::new(&test_seed(), 7);
        let mut ratchet2 = SymmetricRatchet::new(&test_seed(), 7);

        for _ in 0..10 {
            let key1 = ratchet1.advance().unwrap();
            let key2 = ratchet2.advance().unwrap();
            assert_eq!(key1.key(), key2.key(), "same seed must produce same keys");
            assert_eq!(key1.index(), key2.index());
        }
    }

    #[test]
    fn advance_refuses_to_wrap() {
        let mut ratchet = SymmetricRatchet::new(&test_seed(), u32::MAX);
        assert!(matches!(ratchet.advance(), Err(SessionError::IndexSkipTooLarge { .. })));
        assert_eq!(ratchet.index(), u32::MAX);
    }

    #[test]
    fn resolve_at_head_derives_one_link() {
        let mut chain = chain_at(3, SessionConfig::default());

        let key = chain.resolve_key(3).unwrap();
        assert_eq!(key.index(), 3);
        assert_eq!(chain.head(), 4);
        assert_eq!(chain.cached_indices(), vec![3]);

        chain.resolve_key(4).unwrap();
        assert_eq!(chain.head(), 5);
        assert_eq!(chain.cached_indices(), vec![3, 4]);
    }

    #[test]
    fn resolve_skip_derives_intermediate_links() {
        let mut chain = chain_at(0, SessionConfig::default());
        chain.resolve_key(2).unwrap();

        let key = chain.resolve_key(7).unwrap();
        assert_eq!(key.index(), 7);
        assert_eq!(chain.head(), 8);
        assert_eq!(chain.cached_indices(), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn resolve_matches_sequential_advance() {
        let mut ratchet = SymmetricRatchet::new(&test_seed(), 0);
        for _ in 0..5 {
            ratchet.advance().unwrap();
        }
        let sequential = ratchet.advance().unwrap();

        let mut chain = chain_at(0, SessionConfig::default());
        let skipped = chain.resolve_key(5).unwrap();

        assert_eq!(sequential.key(), skipped.key(), "skip and sequential must produce same key");
    }

    #[test]
    fn cached_index_is_idempotent() {
        let mut chain = chain_at(0, SessionConfig::default());

        let first = chain.resolve_key(4).unwrap();
        let again = chain.resolve_key(4).unwrap();
        let skipped = chain.resolve_key(2).unwrap();
        let skipped_again = chain.resolve_key(2).unwrap();

        assert_eq!(first.key(), again.key());
        assert_eq!(skipped.key(), skipped_again.key());
        assert_eq!(chain.head(), 5);
    }

    #[test]
    fn purge_policy_rejects_second_use() {
        let mut chain = chain_at(0, SessionConfig::purge_after_use());

        chain.resolve_key(4).unwrap();
        assert!(matches!(
            chain.resolve_key(4),
            Err(SessionError::ReplayOrExpiredIndex { requested: 4, head: 5 })
        ));

        // Skipped links are still available exactly once
        chain.resolve_key(1).unwrap();
        assert!(matches!(chain.resolve_key(1), Err(SessionError::ReplayOrExpiredIndex { .. })));
        assert_eq!(chain.cached_indices(), vec![0, 2, 3]);
    }

    #[test]
    fn index_before_first_known_is_expired() {
        let mut chain = chain_at(10, SessionConfig::default());
        assert!(matches!(
            chain.resolve_key(9),
            Err(SessionError::ReplayOrExpiredIndex { requested: 9, head: 10 })
        ));
    }

    #[test]
    fn skip_too_large_leaves_chain_untouched() {
        let config = SessionConfig { max_skip: 10, ..SessionConfig::default() };
        let mut chain = chain_at(0, config);
        chain.resolve_key(0).unwrap();

        let result = chain.resolve_key(12);
        assert!(matches!(
            result,
            Err(SessionError::IndexSkipTooLarge { requested: 12, head: 1, max_skip: 10 })
        ));
        assert_eq!(chain.head(), 1);
        assert_eq!(chain.cached_indices(), vec![0]);

        // Exactly max_skip ahead is allowed
        assert_eq!(chain.resolve_key(11).unwrap().index(), 11);
    }

    #[test]
    fn cache_evicts_lowest_indices() {
        let config = SessionConfig { max_cached_links: 3, ..SessionConfig::default() };
        let mut chain = chain_at(0, config);

        chain.resolve_key(5).unwrap();
        assert_eq!(chain.cached_indices(), vec![3, 4, 5]);
        assert!(matches!(chain.resolve_key(1), Err(SessionError::ReplayOrExpiredIndex { .. })));
    }

    #[test]
    fn from_parts_rejects_link_at_or_past_head() {
        let ratchet = SymmetricRatchet::new(&test_seed(), 4);
        let link = MessageKey::from_parts([1u8; 32], 4);

        let initial = SymmetricRatchet::new(&test_seed(), 0);

        let result =
            RatchetChain::from_parts(initial, ratchet, [link], SessionConfig::default());
        assert!(matches!(result, Err(SessionError::CorruptPickle { .. })));
    }

    #[test]
    fn from_parts_rejects_first_index_past_head() {
        let ratchet = SymmetricRatchet::new(&test_seed(), 4);

        let initial = SymmetricRatchet::new(&test_seed(), 5);

        let result = RatchetChain::from_parts(initial, ratchet, [], SessionConfig::default());
        assert!(matches!(result, Err(SessionError::CorruptPickle { .. })));
    }

    #[test]
    fn export_continues_the_same_key_sequence() {
        let mut chain = chain_at(2, SessionConfig::default());
        chain.resolve_key(6).unwrap();

        for index in [2, 4, 7, 20] {
            let mut exported = chain.export_at(index).unwrap();
            assert_eq!(exported.index(), index);

            let mut reference = SymmetricRatchet::new(&test_seed(), 2);
            let mut expected = reference.advance().unwrap();
            while expected.index() < index {
                expected = reference.advance().unwrap();
            }
            assert_eq!(exported.advance().unwrap().key(), expected.key());
        }

        assert_eq!(chain.head(), 7);
    }

    #[test]
    fn export_outside_range_is_none() {
        let config = SessionConfig { max_skip: 10, ..SessionConfig::default() };
        let chain = chain_at(5, config);

        assert!(chain.export_at(4).is_none());
        assert!(chain.export_at(5 + 11).is_none());
        assert!(chain.export_at(5 + 10).is_some());
    }
}
