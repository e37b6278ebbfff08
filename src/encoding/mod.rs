//! Byte encodings used by the in-process store and by diagnostics.
//!
//! `keycode` turns cell coordinates into order-preserving map keys; `format`
//! renders opaque byte strings for logs and error messages.

pub mod format;
pub mod keycode;

/// Error type for encoding operations
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("invalid encoding format: {0}")]
    InvalidFormat(String),
    #[error("truncated data")]
    TruncatedData,
}

impl From<EncodingError> for crate::Error {
    fn from(err: EncodingError) -> Self {
        crate::Error::Decode(format!("cell key: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_error_messages() {
        assert_eq!(
            EncodingError::InvalidFormat("bad escape".to_string()).to_string(),
            "invalid encoding format: bad escape"
        );
        assert_eq!(EncodingError::TruncatedData.to_string(), "truncated data");

        let err: crate::Error = EncodingError::TruncatedData.into();
        assert_eq!(err.to_string(), "Failed to decode cell key: truncated data");
    }
}
