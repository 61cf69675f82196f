//! Fuzz target for the decrypt-event pipeline
//!
//! Drives `decrypt_event` the way a host does: keep the latest pickle,
//! replace it after every successful call.
//!
//! # Strategy
//!
//! - Honest traffic: messages from the session's sender, in any order
//! - Tampered traffic: bit flips anywhere in an honest message
//! - Garbage: arbitrary ciphertext text
//!
//! # Invariants
//!
//! - Never panics
//! - Honest messages decrypt to exactly what was sent, unless their index
//!   was already consumed or is too far ahead
//! - Tampered messages never decrypt
//! - A failed call leaves the host's pickle untouched

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_crypto::{ErrorKind, GroupMessage, InboundGroupSession, SessionConfig, TestSender};
use murmur_ffi::decrypt_event;

const PICKLE_KEY: [u8; 32] = [0x5A; 32];

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    seed: [u8; 32],
    messages: Vec<Vec<u8>>,
    actions: Vec<Action>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Action {
    Deliver { which: u8 },
    Tamper { which: u8, position: u16, mask: u8 },
    Garbage { text: String },
}

fuzz_target!(|scenario: Scenario| {
    let mut sender = TestSender::new(scenario.seed, scenario.seed);
    let mut pickle = InboundGroupSession::new(&sender.session_key(), SessionConfig::default(), 0)
        .pickle_encrypted(&PICKLE_KEY);

    let sent: Vec<(Vec<u8>, GroupMessage)> = scenario
        .messages
        .into_iter()
        .take(32)
        .map(|plaintext| {
            let plaintext: Vec<u8> =
                plaintext.into_iter().filter(|b| b.is_ascii() && *b != 0).collect();
            let message = sender.encrypt(&plaintext);
            (plaintext, message)
        })
        .collect();
    if sent.is_empty() {
        return;
    }

    for action in scenario.actions.into_iter().take(64) {
        let (ciphertext, expected) = match action {
            Action::Deliver { which } => {
                let (plaintext, message) = &sent[usize::from(which) % sent.len()];
                (message.to_base64(), Some(plaintext.clone()))
            },
            Action::Tamper { which, position, mask } => {
                if mask == 0 {
                    continue;
                }
                let (_, message) = &sent[usize::from(which) % sent.len()];
                let mut bytes = message.to_bytes();
                let at = usize::from(position) % bytes.len();
                bytes[at] ^= mask;
                let Ok(tampered) = GroupMessage::from_bytes(&bytes) else {
                    continue;
                };
                (tampered.to_base64(), None)
            },
            Action::Garbage { text } => (text, None),
        };

        match decrypt_event(&pickle, &PICKLE_KEY, &ciphertext) {
            Ok(event) => {
                let Some(expected) = expected else {
                    panic!("tampered or garbage ciphertext decrypted");
                };
                assert_eq!(event.plaintext.as_bytes(), expected.as_slice());
                pickle = event.updated_pickle;
            },
            Err(err) => {
                if expected.is_some() {
                    assert!(
                        matches!(
                            err.kind(),
                            ErrorKind::ReplayOrExpiredIndex | ErrorKind::IndexSkipTooLarge
                        ),
                        "honest message failed: {err}"
                    );
                }
            },
        }
    }
});
