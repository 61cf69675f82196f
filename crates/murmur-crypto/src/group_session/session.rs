//! Inbound group session: signing key, ratchet chain and pickling.

use ed25519_dalek::VerifyingKey;
use zeroize::{Zeroize, Zeroizing};

use super::{
    config::SessionConfig,
    encoding,
    encryption::decrypt_message,
    error::SessionError,
    message::GroupMessage,
    pickle::{PICKLE_KEY_SIZE, PickledLink, SessionPickle},
    ratchet::{MessageKey, RatchetChain, SymmetricRatchet},
};

/// Current version byte of the exported session key format
pub const SESSION_KEY_VERSION: u8 = 0x01;

const SESSION_KEY_SIZE: usize = 1 + 4 + 32 + 32;

/// Session-establishment material for an inbound group session.
///
/// Distributing this to recipients is out of scope; the receiver only needs
/// the chain key at some index and the sender's signing key. The text form
/// is what [`InboundGroupSession::export_at`] hands out and
/// [`InboundGroupSession::import`] reads:
///
/// ```text
/// base64(version:u8 | index:u32 BE | chain_key:[u8; 32] | signing_key:[u8; 32])
/// ```
#[derive(Clone)]
pub struct SessionKey {
    /// Index `chain_key` belongs to
    pub index: u32,
    /// Chain key at `index`
    pub chain_key: [u8; 32],
    /// Sender's Ed25519 public key
    pub signing_key: VerifyingKey,
}

impl SessionKey {
    /// Encode as base64 text.
    pub fn to_base64(&self) -> String {
        let mut bytes = Zeroizing::new(Vec::with_capacity(SESSION_KEY_SIZE));
        bytes.push(SESSION_KEY_VERSION);
        bytes.extend_from_slice(&self.index.to_be_bytes());
        bytes.extend_from_slice(&self.chain_key);
        bytes.extend_from_slice(self.signing_key.as_bytes());
        encoding::encode(&bytes)
    }

    /// Decode from base64 text.
    ///
    /// # Errors
    ///
    /// - `InvalidEncoding`: not base64, wrong length, unknown version or a
    ///   signing key that is not a valid Ed25519 point
    pub fn from_base64(text: &str) -> Result<Self, SessionError> {
        let bytes = Zeroizing::new(encoding::decode(text, "session key")?);
        let invalid = |reason: &str| SessionError::InvalidEncoding {
            reason: format!("session key: {reason}"),
        };

        if bytes.len() != SESSION_KEY_SIZE {
            return Err(invalid("wrong length"));
        }
        if bytes[0] != SESSION_KEY_VERSION {
            return Err(invalid("unknown version"));
        }

        let mut index = [0u8; 4];
        index.copy_from_slice(&bytes[1..5]);
        let mut chain_key = [0u8; 32];
        chain_key.copy_from_slice(&bytes[5..37]);
        let mut signing = [0u8; 32];
        signing.copy_from_slice(&bytes[37..]);

        let signing_key = VerifyingKey::from_bytes(&signing).map_err(|_| {
            chain_key.zeroize();
            invalid("invalid signing key")
        })?;

        Ok(Self { index: u32::from_be_bytes(index), chain_key, signing_key })
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.chain_key.zeroize();
    }
}

/// A successfully decrypted group message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// Decrypted payload bytes
    pub plaintext: Vec<u8>,
    /// Ratchet index of the message
    pub message_index: u32,
    /// Signing key that authenticated the message
    pub sender: VerifyingKey,
}

/// Receiver side of a group session.
///
/// Lives only for one decrypt call: restore from a pickle, decrypt, pickle
/// again. Not shared between threads; concurrent decrypts of the same
/// persisted session must be serialized by the caller.
pub struct InboundGroupSession {
    signing_key: VerifyingKey,
    chain: RatchetChain,
    created_at: u64,
}

impl InboundGroupSession {
    /// Create a session from establishment material.
    ///
    /// `created_at` is the caller's clock in Unix seconds.
    pub fn new(session_key: &SessionKey, config: SessionConfig, created_at: u64) -> Self {
        let ratchet = SymmetricRatchet::new(&session_key.chain_key, session_key.index);
        Self {
            signing_key: session_key.signing_key,
            chain: RatchetChain::new(ratchet, config),
            created_at,
        }
    }

    /// Create a session from an exported session key in text form.
    ///
    /// # Errors
    ///
    /// - `InvalidEncoding`: see [`SessionKey::from_base64`]
    pub fn import(
        exported: &str,
        config: SessionConfig,
        created_at: u64,
    ) -> Result<Self, SessionError> {
        let session_key = SessionKey::from_base64(exported)?;
        Ok(Self::new(&session_key, config, created_at))
    }

    /// Export the chain at `index` so another receiver can decrypt from there on.
    ///
    /// Returns `None` when `index` is before the first known index or more
    /// than `max_skip` past the head. The session itself is not advanced.
    pub fn export_at(&self, index: u32) -> Option<SessionKey> {
        let ratchet = self.chain.export_at(index)?;
        Some(self.session_key_from(&ratchet))
    }

    /// Export the chain at the first index this session can decrypt.
    pub fn export_at_first_known_index(&self) -> SessionKey {
        self.session_key_from(self.chain.initial())
    }

    fn session_key_from(&self, ratchet: &SymmetricRatchet) -> SessionKey {
        SessionKey {
            index: ratchet.index(),
            chain_key: *ratchet.chain_key(),
            signing_key: self.signing_key,
        }
    }

    /// Session identifier: base64 of the sender's signing key.
    pub fn session_id(&self) -> String {
        encoding::encode(self.signing_key.as_bytes())
    }

    /// Sender's Ed25519 public key.
    pub fn sender_key(&self) -> &VerifyingKey {
        &self.signing_key
    }

    /// Lowest index this session can decrypt.
    pub fn first_known_index(&self) -> u32 {
        self.chain.first_known_index()
    }

    /// Chain head: the next index that has not been derived yet.
    pub fn message_index(&self) -> u32 {
        self.chain.head()
    }

    /// Creation time in Unix seconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Ratchet policy of this session.
    pub fn config(&self) -> &SessionConfig {
        self.chain.config()
    }

    /// Underlying ratchet chain.
    pub fn chain(&self) -> &RatchetChain {
        &self.chain
    }

    /// Resolve the message key for `message_index`, advancing the chain.
    pub fn resolve_key(&mut self, message_index: u32) -> Result<MessageKey, SessionError> {
        self.chain.resolve_key(message_index)
    }

    /// Authenticate and decrypt a group message.
    ///
    /// The chain only advances when decryption succeeds, so a forged message
    /// cannot consume an index.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed`: bad signature or AEAD tag
    /// - `ReplayOrExpiredIndex` / `IndexSkipTooLarge`: see
    ///   [`RatchetChain::resolve_key`]
    /// - `MalformedCiphertext`: ciphertext shorter than the tag
    pub fn decrypt(&mut self, message: &GroupMessage) -> Result<DecryptedMessage, SessionError> {
        message.verify(&self.signing_key)?;

        let mut chain = self.chain.clone();
        let message_key = chain.resolve_key(message.message_index)?;
        let plaintext = decrypt_message(message, &message_key)?;
        self.chain = chain;

        Ok(DecryptedMessage {
            plaintext,
            message_index: message.message_index,
            sender: self.signing_key,
        })
    }

    /// Snapshot the session as plain data.
    pub fn pickle(&self) -> SessionPickle {
        SessionPickle {
            signing_key: self.signing_key.to_bytes(),
            chain_key: *self.chain.ratchet().chain_key(),
            chain_index: self.chain.head(),
            first_known_index: self.chain.first_known_index(),
            first_chain_key: *self.chain.initial().chain_key(),
            links: self
                .chain
                .links()
                .map(|link| PickledLink { index: link.index(), key: *link.key() })
                .collect(),
            created_at: self.created_at,
            config: *self.chain.config(),
        }
    }

    /// Pickle and encrypt under a 32-byte key, as base64 text.
    pub fn pickle_encrypted(&self, pickle_key: &[u8; PICKLE_KEY_SIZE]) -> String {
        self.pickle().encrypt(pickle_key)
    }

    /// Restore a session from an encrypted text pickle.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyLength`, `InvalidEncoding`, `CorruptPickle`,
    ///   `UnsupportedVersion`
    pub fn from_pickle_encrypted(text: &str, pickle_key: &[u8]) -> Result<Self, SessionError> {
        let pickle = SessionPickle::from_encrypted(text, pickle_key)?;
        Self::try_from(&pickle)
    }
}

impl TryFrom<&SessionPickle> for InboundGroupSession {
    type Error = SessionError;

    fn try_from(pickle: &SessionPickle) -> Result<Self, Self::Error> {
        let signing_key = VerifyingKey::from_bytes(&pickle.signing_key)
            .map_err(|_| SessionError::CorruptPickle { reason: "invalid signing key" })?;

        let initial = SymmetricRatchet::new(&pickle.first_chain_key, pickle.first_known_index);
        let ratchet = SymmetricRatchet::new(&pickle.chain_key, pickle.chain_index);
        let links =
            pickle.links.iter().map(|link| MessageKey::from_parts(link.key, link.index));
        let chain = RatchetChain::from_parts(initial, ratchet, links, pickle.config)?;

        Ok(Self { signing_key, chain, created_at: pickle.created_at })
    }
}
