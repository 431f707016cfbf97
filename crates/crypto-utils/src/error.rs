use thiserror::Error;

/// Primitive cryptography errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("invalid child key at index {0:#010x}")]
    InvalidChildKey(u32),

    #[error("derivation not possible: {0}")]
    DerivationFailed(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_private_key() {
        let err = CryptoError::InvalidPrivateKey("scalar out of range".into());
        assert_eq!(err.to_string(), "invalid private key: scalar out of range");
    }

    #[test]
    fn display_invalid_encoding() {
        let err = CryptoError::InvalidEncoding("bad checksum".into());
        assert_eq!(err.to_string(), "invalid encoding: bad checksum");
    }

    #[test]
    fn display_invalid_path() {
        let err = CryptoError::InvalidPath("m/x".into());
        assert_eq!(err.to_string(), "invalid derivation path: m/x");
    }

    #[test]
    fn display_invalid_child_key() {
        let err = CryptoError::InvalidChildKey(0x8000_0001);
        assert_eq!(err.to_string(), "invalid child key at index 0x80000001");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> =
            Box::new(CryptoError::SigningFailed("test".into()));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn debug_format_works() {
        let err = CryptoError::DerivationFailed("public parent".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("DerivationFailed"));
    }
}
