//! Fuzz target for ratchet key resolution
//!
//! # Strategy
//!
//! - Random configs: small skip and cache bounds, both key policies
//! - Random index sequences: forward jumps, replays, stale indices, u32::MAX
//!
//! # Invariants
//!
//! - Resolved keys match a reference ratchet advanced sequentially
//! - Failed resolutions leave head and cache untouched
//! - Cache never exceeds `max_cached_links`
//! - Head never moves backwards
//! - Under purge-after-use, a resolved index never resolves again

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_crypto::{KeyPolicy, RatchetChain, SessionConfig, SymmetricRatchet};

#[derive(Debug, Clone, Arbitrary)]
struct ResolveScenario {
    chain_key: [u8; 32],
    start: u16,
    max_skip: u8,
    max_cached_links: u8,
    purge: bool,
    requests: Vec<Request>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Request {
    Ahead(u8),
    Behind(u8),
    Max,
}

fn reference_key(chain_key: &[u8; 32], start: u32, index: u32) -> [u8; 32] {
    let mut ratchet = SymmetricRatchet::new(chain_key, start);
    loop {
        let Ok(key) = ratchet.advance() else {
            unreachable!("reference ratchet stays below u32::MAX");
        };
        if key.index() == index {
            return *key.key();
        }
    }
}

fuzz_target!(|scenario: ResolveScenario| {
    let start = u32::from(scenario.start);
    let config = SessionConfig {
        max_skip: u32::from(scenario.max_skip),
        max_cached_links: u32::from(scenario.max_cached_links),
        key_policy: if scenario.purge { KeyPolicy::PurgeAfterUse } else { KeyPolicy::Cache },
    };
    let mut chain = RatchetChain::new(SymmetricRatchet::new(&scenario.chain_key, start), config);
    let mut consumed = HashSet::new();

    for request in scenario.requests.into_iter().take(64) {
        let index = match request {
            Request::Ahead(n) => chain.head().saturating_add(u32::from(n)),
            Request::Behind(n) => chain.head().saturating_sub(u32::from(n) + 1),
            Request::Max => u32::MAX,
        };

        let head = chain.head();
        let cached = chain.cached_indices();

        match chain.resolve_key(index) {
            Ok(key) => {
                assert_eq!(key.index(), index);
                assert_eq!(*key.key(), reference_key(&scenario.chain_key, start, index));
                assert!(index >= start, "resolved an index before the session start");
                if scenario.purge {
                    assert!(consumed.insert(index), "purged index resolved twice");
                }
            },
            Err(_) => {
                assert_eq!(chain.head(), head, "failed resolve moved the head");
                assert_eq!(chain.cached_indices(), cached, "failed resolve touched the cache");
            },
        }

        assert!(chain.head() >= head);
        assert!(chain.cached_indices().len() <= config.max_cached_links as usize);
    }
});
