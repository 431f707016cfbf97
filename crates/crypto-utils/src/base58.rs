//! Base58Check: payload followed by the first four bytes of its SHA-256d.

use crate::error::CryptoError;

/// Encode `payload` (version byte included) with a trailing checksum.
pub fn encode_check(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

/// Decode a Base58Check string, verifying and stripping the checksum.
pub fn decode_check(s: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|e| CryptoError::InvalidEncoding(format!("base58check: {e}")))
}
