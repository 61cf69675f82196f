//! Base64 text form shared by pickles and messages.
//!
//! Encodes without padding; decodes with or without it.

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

use super::error::SessionError;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn encode(bytes: &[u8]) -> String {
    ENGINE.encode(bytes)
}

/// Decode base64 text, padded or not, ignoring surrounding whitespace.
///
/// # Errors
///
/// - `InvalidEncoding` naming `what` if the text is not base64
pub fn decode(text: &str, what: &str) -> Result<Vec<u8>, SessionError> {
    ENGINE
        .decode(text.trim())
        .map_err(|e| SessionError::InvalidEncoding { reason: format!("{what}: {e}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_unpadded() {
        assert_eq!(encode(b"a"), "YQ");
    }

    #[test]
    fn decode_accepts_padding() {
        assert_eq!(decode("YQ==", "test").unwrap(), b"a");
        assert_eq!(decode("YQ", "test").unwrap(), b"a");
    }

    #[test]
    fn decode_error_names_input() {
        let err = decode("***", "pickle").unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidEncoding { reason } if reason.starts_with("pickle")
        ));
    }
}
