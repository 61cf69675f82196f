//! Deterministic message producer for tests.
//!
//! Stands in for the remote sender so inbound sessions can be exercised
//! without an outbound session implementation. Nonces are derived from the
//! message index, which is only acceptable because every index is used once.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use super::{
    encryption::encrypt_message,
    message::{GroupMessage, NONCE_SIZE},
    ratchet::SymmetricRatchet,
    session::SessionKey,
};

/// Test-only sender holding a ratchet and a signing key.
pub struct TestSender {
    ratchet: SymmetricRatchet,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl TestSender {
    /// Sender starting at index 0 with the given chain seed and signing seed.
    pub fn new(chain_seed: [u8; 32], signing_seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&signing_seed);
        let verifying_key = signing_key.verifying_key();
        Self { ratchet: SymmetricRatchet::new(&chain_seed, 0), signing_key, verifying_key }
    }

    /// Session key for a receiver joining at the sender's current index.
    pub fn session_key(&self) -> SessionKey {
        SessionKey {
            index: self.ratchet.index(),
            chain_key: *self.ratchet.chain_key(),
            signing_key: self.verifying_key,
        }
    }

    /// Public half of the signing key.
    pub fn signing_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Index the next [`encrypt`](Self::encrypt) will use.
    pub fn message_index(&self) -> u32 {
        self.ratchet.index()
    }

    /// Discard message keys until the next index is `index`.
    pub fn skip_to(&mut self, index: u32) {
        while self.ratchet.index() < index {
            let Ok(_) = self.ratchet.advance() else {
                return;
            };
        }
    }

    /// Encrypt and sign `plaintext` at the next index.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> GroupMessage {
        let Ok(message_key) = self.ratchet.advance() else {
            unreachable!("test sender never reaches u32::MAX");
        };

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..4].copy_from_slice(&message_key.index().to_be_bytes());

        let mut message = GroupMessage {
            message_index: message_key.index(),
            nonce,
            ciphertext: Vec::new(),
            signature: [0u8; 64],
        };
        message.ciphertext =
            encrypt_message(plaintext, &message_key, &nonce, &message.associated_data());
        message.signature = self.signing_key.sign(&message.signed_bytes()).to_bytes();
        message
    }
}
