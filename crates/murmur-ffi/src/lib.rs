//! C ABI for Murmur inbound group sessions.
//!
//! Host applications (push notification extensions in particular) hold an
//! encrypted session pickle and receive a base64 ciphertext. One call
//! decrypts it and returns the plaintext together with the advanced pickle.
//!
//! # Layers
//!
//! - [`adapter`]: safe Rust entry point, [`decrypt_event`]
//! - [`capi`]: `extern "C"` functions and the [`MurmurDecryptResult`] struct,
//!   declared for C in `include/murmur.h`
//!
//! # Ownership
//!
//! Every pointer in a [`MurmurDecryptResult`] belongs to this library and is
//! released with [`capi::murmur_free_result`]. Inputs are only borrowed for
//! the duration of the call. Panics never cross the boundary; release builds
//! abort.

#![deny(missing_docs)]

pub mod adapter;
#[allow(unsafe_code)]
pub mod capi;

pub use adapter::{DecryptedEvent, decrypt_event};
pub use capi::MurmurDecryptResult;
