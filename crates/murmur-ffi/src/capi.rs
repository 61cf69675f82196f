//! C ABI over [`decrypt_event`].
//!
//! Every string handed out is a NUL-terminated buffer owned by this library.
//! Callers release a whole result with [`murmur_free_result`] and stray
//! strings with [`murmur_free_string`]. Plaintext and pickle buffers are
//! zeroed before they are freed.

use std::{
    ffi::{CStr, CString, c_char},
    ptr, slice,
};

use murmur_crypto::{ErrorKind, SessionError};
use zeroize::Zeroize;

use crate::adapter::{DecryptedEvent, decrypt_event};

/// Outcome of [`murmur_decrypt_event`].
///
/// On success `error_code` is 0, `error` is null and both `plaintext` and
/// `updated_pickle` are set. On failure `error_code` is an
/// [`ErrorKind`] code, `error` describes it and the other pointers are null.
#[repr(C)]
#[derive(Debug)]
pub struct MurmurDecryptResult {
    /// Decrypted UTF-8 text, or null
    pub plaintext: *mut c_char,
    /// Advanced session pickle to store in place of the input, or null
    pub updated_pickle: *mut c_char,
    /// Failure description, or null
    pub error: *mut c_char,
    /// 0 on success, otherwise an [`ErrorKind`] code
    pub error_code: u32,
    /// Ratchet index of the decrypted message, 0 on failure
    pub message_index: u32,
}

impl MurmurDecryptResult {
    fn success(event: DecryptedEvent) -> Self {
        let DecryptedEvent { plaintext, message_index, updated_pickle } = event;

        // decrypt_event already rejects NUL bytes in the plaintext and pickles
        // are base64, so both conversions only fail on a broken invariant.
        let (Ok(plaintext), Ok(updated_pickle)) =
            (CString::new(plaintext), CString::new(updated_pickle))
        else {
            return Self::failure(&SessionError::InvalidEncoding {
                reason: "output contains a NUL byte".to_string(),
            });
        };

        Self {
            plaintext: plaintext.into_raw(),
            updated_pickle: updated_pickle.into_raw(),
            error: ptr::null_mut(),
            error_code: 0,
            message_index,
        }
    }

    fn failure(error: &SessionError) -> Self {
        tracing::debug!(kind = %error.kind(), "event decryption failed");

        let error_text = CString::new(error.to_string()).map_or(ptr::null_mut(), CString::into_raw);
        Self {
            plaintext: ptr::null_mut(),
            updated_pickle: ptr::null_mut(),
            error: error_text,
            error_code: error.kind().code(),
            message_index: 0,
        }
    }
}

/// Decrypt one event with a pickled inbound group session.
///
/// `pickle` and `ciphertext` are NUL-terminated base64 strings. `pickle_key`
/// points at `pickle_key_len` bytes and must be 32 long. Null pointers and
/// strings that are not UTF-8 yield `InvalidEncoding`.
///
/// The result must be released with [`murmur_free_result`].
///
/// # Safety
///
/// Each non-null pointer must be valid for reads for the duration of the
/// call: `pickle` and `ciphertext` up to and including their NUL terminator,
/// `pickle_key` for `pickle_key_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn murmur_decrypt_event(
    pickle: *const c_char,
    pickle_key: *const u8,
    pickle_key_len: usize,
    ciphertext: *const c_char,
) -> MurmurDecryptResult {
    // SAFETY: pointer validity is the caller's contract, forwarded unchanged
    let inputs = unsafe { read_inputs(pickle, pickle_key, pickle_key_len, ciphertext) };

    match inputs.and_then(|(pickle, key, ciphertext)| decrypt_event(pickle, key, ciphertext)) {
        Ok(event) => MurmurDecryptResult::success(event),
        Err(error) => MurmurDecryptResult::failure(&error),
    }
}

/// Release every string in a result and null the fields.
///
/// Calling it again on the same result, or passing null, is a no-op.
///
/// # Safety
///
/// `result` must be null or point to a result returned by
/// [`murmur_decrypt_event`] whose strings have not been freed elsewhere.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn murmur_free_result(result: *mut MurmurDecryptResult) {
    // SAFETY: null or a valid, exclusively borrowed result per the contract
    let Some(result) = (unsafe { result.as_mut() }) else {
        return;
    };

    // SAFETY: each field is null or came from CString::into_raw
    unsafe {
        free_zeroized(result.plaintext);
        free_zeroized(result.updated_pickle);
        drop_c_string(result.error);
    }

    result.plaintext = ptr::null_mut();
    result.updated_pickle = ptr::null_mut();
    result.error = ptr::null_mut();
}

/// Release a single string handed out by this library.
///
/// # Safety
///
/// `s` must be null or a pointer taken from a [`MurmurDecryptResult`] field
/// that is then cleared by the caller. Freeing the same pointer twice is
/// undefined behavior.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn murmur_free_string(s: *mut c_char) {
    // SAFETY: forwarded caller contract
    unsafe { free_zeroized(s) }
}

/// Static name for an error code, e.g. `"corrupt_pickle"`.
///
/// Returns `"ok"` for 0 and `"unknown"` for unrecognized codes. The string
/// is static and must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn murmur_error_name(code: u32) -> *const c_char {
    let name: &'static CStr = match ErrorKind::from_code(code) {
        Some(ErrorKind::InvalidKeyLength) => c"invalid_key_length",
        Some(ErrorKind::CorruptPickle) => c"corrupt_pickle",
        Some(ErrorKind::UnsupportedVersion) => c"unsupported_version",
        Some(ErrorKind::ReplayOrExpiredIndex) => c"replay_or_expired_index",
        Some(ErrorKind::IndexSkipTooLarge) => c"index_skip_too_large",
        Some(ErrorKind::AuthenticationFailed) => c"authentication_failed",
        Some(ErrorKind::MalformedCiphertext) => c"malformed_ciphertext",
        Some(ErrorKind::InvalidEncoding) => c"invalid_encoding",
        None if code == 0 => c"ok",
        None => c"unknown",
    };
    name.as_ptr()
}

/// Borrow the raw inputs as Rust types.
///
/// # Safety
///
/// Same contract as [`murmur_decrypt_event`]; the returned borrows must not
/// outlive the call.
unsafe fn read_inputs<'a>(
    pickle: *const c_char,
    pickle_key: *const u8,
    pickle_key_len: usize,
    ciphertext: *const c_char,
) -> Result<(&'a str, &'a [u8], &'a str), SessionError> {
    // SAFETY: caller guarantees NUL-terminated strings
    let pickle = unsafe { c_str(pickle, "pickle")? };
    // SAFETY: caller guarantees NUL-terminated strings
    let ciphertext = unsafe { c_str(ciphertext, "ciphertext")? };

    if pickle_key.is_null() {
        return Err(SessionError::InvalidEncoding {
            reason: "pickle key: null pointer".to_string(),
        });
    }
    // SAFETY: non-null and readable for pickle_key_len bytes per the contract
    let pickle_key = unsafe { slice::from_raw_parts(pickle_key, pickle_key_len) };

    Ok((pickle, pickle_key, ciphertext))
}

/// # Safety
///
/// `s` must be null or a valid NUL-terminated string.
unsafe fn c_str<'a>(s: *const c_char, what: &str) -> Result<&'a str, SessionError> {
    if s.is_null() {
        return Err(SessionError::InvalidEncoding { reason: format!("{what}: null pointer") });
    }

    // SAFETY: non-null, NUL-terminated per the contract
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map_err(|_| SessionError::InvalidEncoding { reason: format!("{what}: not UTF-8") })
}

/// # Safety
///
/// `s` must be null or come from `CString::into_raw` and not be freed yet.
unsafe fn free_zeroized(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    // SAFETY: reclaims ownership of a CString produced by this library
    let mut bytes = unsafe { CString::from_raw(s) }.into_bytes_with_nul();
    bytes.zeroize();
}

/// # Safety
///
/// `s` must be null or come from `CString::into_raw` and not be freed yet.
unsafe fn drop_c_string(s: *mut c_char) {
    if !s.is_null() {
        // SAFETY: reclaims ownership of a CString produced by this library
        drop(unsafe { CString::from_raw(s) });
    }
}
