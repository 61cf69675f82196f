//! Notification decryption flow.
//!
//! ```text
//! SecretStore::get_secret(account) -> normalize -> 32-byte pickle key
//! PickleStore::lookup_pickle(session_id) -> pickle text
//! decrypt_event(pickle, key, ciphertext) -> plaintext + advanced pickle
//! PickleStore::store_pickle(session_id, advanced pickle)   (optional)
//! payload::message_body(plaintext) -> content.body
//! ```
//!
//! Sessions enter the store either as pickles or as exported session keys,
//! which are pickled under the stored key on import.

use murmur_crypto::{InboundGroupSession, PICKLE_KEY_SIZE, SessionConfig};
use murmur_ffi::decrypt_event;
use zeroize::Zeroizing;

use crate::{
    config::NotifyConfig,
    error::NotifyError,
    payload::message_body,
    store::{PickleStore, SecretStore, normalize_pickle_key},
};

/// A decrypted notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedNotification {
    /// Full decrypted payload
    pub plaintext: String,
    /// Displayable `content.body`, if present
    pub body: Option<String>,
    /// Ratchet index of the message
    pub message_index: u32,
}

/// Decrypts push notification ciphertexts with stored sessions.
pub struct NotificationDecryptor<S, P> {
    secrets: S,
    pickles: P,
    pickle_key_account: String,
    persist_updated_pickle: bool,
}

impl<S: SecretStore, P: PickleStore> NotificationDecryptor<S, P> {
    /// Decryptor over the given stores, using the account and persistence
    /// settings from `config`.
    pub fn new(secrets: S, pickles: P, config: &NotifyConfig) -> Self {
        Self {
            secrets,
            pickles,
            pickle_key_account: config.pickle_key_account.clone(),
            persist_updated_pickle: config.persist_updated_pickle,
        }
    }

    /// Pickle store in use.
    pub fn pickles(&self) -> &P {
        &self.pickles
    }

    /// Decrypt `ciphertext` with the session stored under `session_id`.
    ///
    /// # Errors
    ///
    /// - `MissingPickleKey` / `InvalidPickleKey`: secret store has no usable
    ///   key
    /// - `SessionNotFound`: no pickle for `session_id`
    /// - `Store`: a store backend failed
    /// - `Decrypt`: the session rejected the pickle or the ciphertext
    pub fn decrypt(
        &self,
        session_id: &str,
        ciphertext: &str,
    ) -> Result<DecryptedNotification, NotifyError> {
        let pickle_key = self.pickle_key()?;

        let pickle = self
            .pickles
            .lookup_pickle(session_id)?
            .ok_or_else(|| NotifyError::SessionNotFound { session_id: session_id.to_string() })?;

        let event = decrypt_event(&pickle, pickle_key.as_slice(), ciphertext)?;

        if self.persist_updated_pickle {
            self.pickles.store_pickle(session_id, &event.updated_pickle)?;
        }

        tracing::debug!(session_id, message_index = event.message_index, "decrypted notification");

        let body = message_body(&event.plaintext);
        Ok(DecryptedNotification {
            plaintext: event.plaintext,
            body,
            message_index: event.message_index,
        })
    }

    /// Create a session from an exported session key and store its pickle.
    ///
    /// Returns the session ID the pickle was stored under. An existing pickle
    /// for the same ID is replaced.
    ///
    /// # Errors
    ///
    /// - `MissingPickleKey` / `InvalidPickleKey`: secret store has no usable
    ///   key
    /// - `Decrypt`: the exported key is malformed
    /// - `Store`: the pickle store failed
    pub fn import_session_key(
        &self,
        exported: &str,
        config: SessionConfig,
        created_at: u64,
    ) -> Result<String, NotifyError> {
        let pickle_key = self.pickle_key()?;
        let session = InboundGroupSession::import(exported, config, created_at)?;
        let session_id = session.session_id();

        self.pickles.store_pickle(&session_id, &session.pickle_encrypted(&pickle_key))?;
        tracing::info!(
            session_id = %session_id,
            first_known_index = session.first_known_index(),
            "session imported"
        );
        Ok(session_id)
    }

    fn pickle_key(&self) -> Result<Zeroizing<[u8; PICKLE_KEY_SIZE]>, NotifyError> {
        let secret = self.secrets.get_secret(&self.pickle_key_account)?.ok_or_else(|| {
            NotifyError::MissingPickleKey { account: self.pickle_key_account.clone() }
        })?;
        normalize_pickle_key(&secret)
    }

    /// Displayable body for a notification, `None` on any failure.
    ///
    /// Failures are logged by kind only.
    pub fn decrypt_body(&self, session_id: &str, ciphertext: &str) -> Option<String> {
        match self.decrypt(session_id, ciphertext) {
            Ok(notification) => notification.body,
            Err(e) => {
                tracing::warn!(session_id, kind = e.label(), "notification decryption failed");
                None
            },
        }
    }
}
