//! End-to-end decrypt through the C ABI.
//!
//! Sessions are pickled with the core crate, messages come from a
//! `TestSender`, and every call goes through `murmur_decrypt_event` with raw
//! C strings the way a host application would make it.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString};

use murmur_crypto::{ErrorKind, InboundGroupSession, SessionConfig, TestSender};
use murmur_ffi::{
    MurmurDecryptResult,
    capi::{murmur_decrypt_event, murmur_free_result, murmur_free_string},
};

const ZERO_KEY: [u8; 32] = [0u8; 32];

/// Owned copy of a result, taken before the result is freed.
#[derive(Debug)]
struct Outcome {
    plaintext: Option<String>,
    updated_pickle: Option<String>,
    error: Option<String>,
    error_code: u32,
    message_index: u32,
}

fn read(ptr: *const std::ffi::c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null result fields are NUL-terminated library strings
    Some(unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string())
}

fn call(pickle: &str, key: &[u8], ciphertext: &str) -> Outcome {
    let pickle = CString::new(pickle).unwrap();
    let ciphertext = CString::new(ciphertext).unwrap();

    // SAFETY: all pointers are valid for the duration of the call
    let mut result: MurmurDecryptResult = unsafe {
        murmur_decrypt_event(pickle.as_ptr(), key.as_ptr(), key.len(), ciphertext.as_ptr())
    };

    let outcome = Outcome {
        plaintext: read(result.plaintext),
        updated_pickle: read(result.updated_pickle),
        error: read(result.error),
        error_code: result.error_code,
        message_index: result.message_index,
    };

    // SAFETY: result came from murmur_decrypt_event and is freed once
    unsafe { murmur_free_result(&mut result) };
    assert!(result.plaintext.is_null());
    assert!(result.updated_pickle.is_null());
    assert!(result.error.is_null());

    outcome
}

/// Sender advanced to index 3, with a receiver pickle joined there.
fn session_at_three(config: SessionConfig) -> (TestSender, String) {
    let mut sender = TestSender::new([7u8; 32], [8u8; 32]);
    sender.skip_to(3);
    let session = InboundGroupSession::new(&sender.session_key(), config, 1_700_000_000);
    (sender, session.pickle_encrypted(&ZERO_KEY))
}

#[test]
fn test_decrypt_at_next_index() {
    let (mut sender, pickle) = session_at_three(SessionConfig::default());
    sender.skip_to(4);
    let ciphertext = sender.encrypt(b"hello group").to_base64();

    let outcome = call(&pickle, &ZERO_KEY, &ciphertext);
    assert_eq!(outcome.error_code, 0, "{:?}", outcome.error);
    assert_eq!(outcome.plaintext.as_deref(), Some("hello group"));
    assert_eq!(outcome.message_index, 4);
    assert!(outcome.error.is_none());

    let advanced = InboundGroupSession::from_pickle_encrypted(
        outcome.updated_pickle.as_deref().unwrap(),
        &ZERO_KEY,
    )
    .unwrap();
    assert_eq!(advanced.message_index(), 5);
}

#[test]
fn test_one_byte_key_change_is_corrupt_pickle() {
    let (mut sender, pickle) = session_at_three(SessionConfig::default());
    sender.skip_to(4);
    let ciphertext = sender.encrypt(b"hello group").to_base64();

    let mut wrong_key = ZERO_KEY;
    wrong_key[31] = 0x01;

    let outcome = call(&pickle, &wrong_key, &ciphertext);
    assert_eq!(outcome.error_code, ErrorKind::CorruptPickle.code());
    assert!(outcome.plaintext.is_none());
    assert!(outcome.updated_pickle.is_none());
    assert!(outcome.error.unwrap().starts_with("corrupt pickle"));
}

#[test]
fn test_wrong_key_length() {
    let (mut sender, pickle) = session_at_three(SessionConfig::default());
    let ciphertext = sender.encrypt(b"x").to_base64();

    let outcome = call(&pickle, &[0u8; 31], &ciphertext);
    assert_eq!(outcome.error_code, ErrorKind::InvalidKeyLength.code());
}

#[test]
fn test_repeat_call_is_deterministic() {
    let (mut sender, pickle) = session_at_three(SessionConfig::default());
    let ciphertext = sender.encrypt(b"same bytes").to_base64();

    let first = call(&pickle, &ZERO_KEY, &ciphertext);
    let second = call(&pickle, &ZERO_KEY, &ciphertext);
    assert_eq!(first.plaintext, second.plaintext);
    assert_eq!(first.updated_pickle, second.updated_pickle);
}

#[test]
fn test_replay_against_updated_pickle() {
    for (config, expect_replay) in
        [(SessionConfig::default(), false), (SessionConfig::purge_after_use(), true)]
    {
        let (mut sender, pickle) = session_at_three(config);
        let ciphertext = sender.encrypt(b"once").to_base64();

        let first = call(&pickle, &ZERO_KEY, &ciphertext);
        let second = call(first.updated_pickle.as_deref().unwrap(), &ZERO_KEY, &ciphertext);

        if expect_replay {
            assert_eq!(second.error_code, ErrorKind::ReplayOrExpiredIndex.code());
        } else {
            assert_eq!(second.plaintext.as_deref(), Some("once"));
        }
    }
}

#[test]
fn test_skip_too_large() {
    let config = SessionConfig { max_skip: 10, ..SessionConfig::default() };
    let (mut sender, pickle) = session_at_three(config);
    sender.skip_to(3 + 11);
    let ciphertext = sender.encrypt(b"far ahead").to_base64();

    let outcome = call(&pickle, &ZERO_KEY, &ciphertext);
    assert_eq!(outcome.error_code, ErrorKind::IndexSkipTooLarge.code());
}

#[test]
fn test_message_from_other_sender_fails_authentication() {
    let (_, pickle) = session_at_three(SessionConfig::default());
    let mut impostor = TestSender::new([7u8; 32], [9u8; 32]);
    impostor.skip_to(3);
    let ciphertext = impostor.encrypt(b"forged").to_base64();

    let outcome = call(&pickle, &ZERO_KEY, &ciphertext);
    assert_eq!(outcome.error_code, ErrorKind::AuthenticationFailed.code());
}

#[test]
fn test_malformed_inputs() {
    let (_, pickle) = session_at_three(SessionConfig::default());

    let outcome = call("invalid_base64_pickle!", &ZERO_KEY, "AAAA");
    assert_eq!(outcome.error_code, ErrorKind::InvalidEncoding.code());

    let outcome = call(&pickle, &ZERO_KEY, "AAAA");
    assert_eq!(outcome.error_code, ErrorKind::MalformedCiphertext.code());
}

#[test]
fn test_encoding_error_reported_before_key_errors() {
    let (_, pickle) = session_at_three(SessionConfig::default());
    let mut wrong_key = ZERO_KEY;
    wrong_key[0] = 0x01;

    let outcome = call(&pickle, &wrong_key, "%%% not base64 %%%");
    assert_eq!(outcome.error_code, ErrorKind::InvalidEncoding.code());

    let outcome = call("%%% not base64 %%%", &[0u8; 31], "AAAA");
    assert_eq!(outcome.error_code, ErrorKind::InvalidEncoding.code());
}

#[test]
fn test_non_utf8_input_string() {
    let pickle = CString::new(vec![0xC3, 0x28]).unwrap();
    let ciphertext = CString::new("AAAA").unwrap();

    // SAFETY: all pointers are valid for the duration of the call
    let mut result = unsafe {
        murmur_decrypt_event(pickle.as_ptr(), ZERO_KEY.as_ptr(), 32, ciphertext.as_ptr())
    };
    assert_eq!(result.error_code, ErrorKind::InvalidEncoding.code());

    // Strings can also be released one at a time
    // SAFETY: the field is freed once and cleared right after
    unsafe { murmur_free_string(result.error) };
    result.error = std::ptr::null_mut();
    // SAFETY: remaining fields are null
    unsafe { murmur_free_result(&mut result) };
}
