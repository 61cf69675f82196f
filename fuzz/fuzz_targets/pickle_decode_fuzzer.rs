//! Fuzz target for pickle decoding
//!
//! # Strategy
//!
//! - Raw text: arbitrary strings as pickle text under arbitrary keys
//! - Raw bytes: arbitrary blobs through the binary decoder
//! - Mutated pickles: byte flips, truncation and extension of a valid pickle
//!
//! # Invariants
//!
//! - Decoding never panics
//! - A mutated pickle either fails or decodes to exactly the original
//! - A valid pickle under any other key fails with `CorruptPickle`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_crypto::{ErrorKind, InboundGroupSession, SessionConfig, SessionPickle, TestSender};

#[derive(Debug, Clone, Arbitrary)]
enum PickleInput {
    RawText { text: String, key: Vec<u8> },
    RawBytes { bytes: Vec<u8>, key: [u8; 32] },
    Mutated { seed: [u8; 32], skip: u8, key: [u8; 32], mutation: Mutation },
    WrongKey { seed: [u8; 32], key: [u8; 32], other: [u8; 32] },
}

#[derive(Debug, Clone, Arbitrary)]
enum Mutation {
    Flip { position: u16, mask: u8 },
    Truncate { len: u16 },
    Extend { tail: Vec<u8> },
}

fn valid_pickle(seed: [u8; 32], skip: u8) -> SessionPickle {
    let mut sender = TestSender::new(seed, seed);
    sender.skip_to(u32::from(skip));
    let mut session = InboundGroupSession::new(&sender.session_key(), SessionConfig::default(), 0);
    let _ = session.resolve_key(u32::from(skip) + 3);
    session.pickle()
}

fuzz_target!(|input: PickleInput| {
    match input {
        PickleInput::RawText { text, key } => {
            let _ = InboundGroupSession::from_pickle_encrypted(&text, &key);
        },
        PickleInput::RawBytes { bytes, key } => {
            let _ = SessionPickle::open(&bytes, &key);
        },
        PickleInput::Mutated { seed, skip, key, mutation } => {
            let original = valid_pickle(seed, skip);
            let mut blob = original.seal(&key);

            match mutation {
                Mutation::Flip { position, mask } => {
                    let at = usize::from(position) % blob.len();
                    blob[at] ^= mask;
                },
                Mutation::Truncate { len } => blob.truncate(usize::from(len)),
                Mutation::Extend { tail } => blob.extend_from_slice(&tail),
            }

            if let Ok(decoded) = SessionPickle::open(&blob, &key) {
                assert!(decoded == original, "mutated pickle decoded to different state");
            }
        },
        PickleInput::WrongKey { seed, key, other } => {
            if key == other {
                return;
            }
            let blob = valid_pickle(seed, 0).seal(&key);
            let err = SessionPickle::open(&blob, &other).err();
            assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::CorruptPickle));
        },
    }
});
