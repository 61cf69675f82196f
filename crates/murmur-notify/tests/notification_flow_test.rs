//! End-to-end notification decryption against on-disk stores.
//!
//! Sessions are stored in a Redb database and the pickle key in a secrets
//! directory, then the database is reopened between decrypts to check that
//! advanced pickles survive restarts.

use base64::{Engine, engine::general_purpose::STANDARD};
use murmur_crypto::{ErrorKind, InboundGroupSession, SessionConfig, TestSender};
use murmur_notify::{
    FileSecretStore, NotificationDecryptor, NotifyConfig, NotifyError, PickleStore,
    RedbPickleStore,
};
use tempfile::tempdir;

const PICKLE_KEY: [u8; 32] = [0x42; 32];

fn event(body: &str) -> Vec<u8> {
    format!(r#"{{"type":"m.room.message","content":{{"msgtype":"m.text","body":"{body}"}}}}"#)
        .into_bytes()
}

fn config_in(dir: &std::path::Path) -> NotifyConfig {
    NotifyConfig {
        db_path: dir.join("sessions.redb"),
        secrets_dir: dir.join("secrets"),
        ..NotifyConfig::default()
    }
}

#[test]
fn test_advanced_pickle_survives_restart() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let secrets = FileSecretStore::new(&config.secrets_dir);
    secrets.set_secret(&config.pickle_key_account, STANDARD.encode(PICKLE_KEY).as_bytes()).unwrap();

    let mut sender = TestSender::new([5u8; 32], [6u8; 32]);
    let session =
        InboundGroupSession::new(&sender.session_key(), SessionConfig::purge_after_use(), 0);
    let session_id = session.session_id();

    {
        let pickles = RedbPickleStore::open(&config.db_path).unwrap();
        pickles.store_pickle(&session_id, &session.pickle_encrypted(&PICKLE_KEY)).unwrap();
    }

    let first = sender.encrypt(&event("first")).to_base64();
    let second = sender.encrypt(&event("second")).to_base64();

    {
        let pickles = RedbPickleStore::open(&config.db_path).unwrap();
        let decryptor = NotificationDecryptor::new(secrets.clone(), pickles, &config);
        assert_eq!(decryptor.decrypt_body(&session_id, &second).as_deref(), Some("second"));
    }

    // Reopen: the skipped index is still available, the consumed one is not
    {
        let pickles = RedbPickleStore::open(&config.db_path).unwrap();
        let decryptor = NotificationDecryptor::new(secrets.clone(), pickles, &config);

        assert_eq!(decryptor.decrypt_body(&session_id, &first).as_deref(), Some("first"));

        let replay = decryptor.decrypt(&session_id, &second).unwrap_err();
        assert_eq!(replay.session_kind(), Some(ErrorKind::ReplayOrExpiredIndex));
    }

    let pickles = RedbPickleStore::open(&config.db_path).unwrap();
    let stored = pickles.lookup_pickle(&session_id).unwrap().unwrap();
    let restored = InboundGroupSession::from_pickle_encrypted(&stored, &PICKLE_KEY).unwrap();
    assert_eq!(restored.message_index(), 2);
    assert!(restored.chain().cached_indices().is_empty());
}

#[test]
fn test_raw_key_file_is_accepted() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let secrets = FileSecretStore::new(&config.secrets_dir);
    secrets.set_secret(&config.pickle_key_account, &PICKLE_KEY).unwrap();

    let mut sender = TestSender::new([5u8; 32], [6u8; 32]);
    let session = InboundGroupSession::new(&sender.session_key(), SessionConfig::default(), 0);
    let pickles = RedbPickleStore::open(&config.db_path).unwrap();
    pickles.store_pickle("s", &session.pickle_encrypted(&PICKLE_KEY)).unwrap();

    let decryptor = NotificationDecryptor::new(secrets, pickles, &config);
    let ciphertext = sender.encrypt(&event("raw key")).to_base64();
    assert_eq!(decryptor.decrypt_body("s", &ciphertext).as_deref(), Some("raw key"));
}

#[test]
fn test_wrong_stored_key_is_corrupt_pickle() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let mut wrong = PICKLE_KEY;
    wrong[0] ^= 0x01;
    let secrets = FileSecretStore::new(&config.secrets_dir);
    secrets.set_secret(&config.pickle_key_account, &wrong).unwrap();

    let mut sender = TestSender::new([5u8; 32], [6u8; 32]);
    let session = InboundGroupSession::new(&sender.session_key(), SessionConfig::default(), 0);
    let pickles = RedbPickleStore::open(&config.db_path).unwrap();
    pickles.store_pickle("s", &session.pickle_encrypted(&PICKLE_KEY)).unwrap();

    let decryptor = NotificationDecryptor::new(secrets, pickles, &config);
    let ciphertext = sender.encrypt(&event("never shown")).to_base64();

    let err = decryptor.decrypt("s", &ciphertext).unwrap_err();
    assert_eq!(err.session_kind(), Some(ErrorKind::CorruptPickle));
    assert_eq!(decryptor.decrypt_body("s", &ciphertext), None);
}

#[test]
fn test_short_stored_key_is_rejected() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());

    let secrets = FileSecretStore::new(&config.secrets_dir);
    secrets.set_secret(&config.pickle_key_account, &[1u8; 16]).unwrap();
    let pickles = RedbPickleStore::open(&config.db_path).unwrap();

    let decryptor = NotificationDecryptor::new(secrets, pickles, &config);
    assert!(matches!(
        decryptor.decrypt("s", "AAAA"),
        Err(NotifyError::InvalidPickleKey { len: 16 })
    ));
}
