//! Segwit address strings (BIP-173 Bech32 for v0, BIP-350 Bech32m above).

use bech32::{segwit, Fe32, Hrp};

use crate::error::CryptoError;

/// Highest witness version a segwit address may carry.
pub const MAX_WITNESS_VERSION: u8 = 16;

/// Encode a witness program. The output is lowercase.
pub fn encode(hrp: &str, version: u8, program: &[u8]) -> Result<String, CryptoError> {
    let hrp = Hrp::parse(hrp).map_err(|e| CryptoError::InvalidEncoding(format!("hrp: {e}")))?;
    let version = Fe32::try_from(version)
        .map_err(|e| CryptoError::InvalidEncoding(format!("witness version: {e}")))?;
    segwit::encode(hrp, version, program)
        .map_err(|e| CryptoError::InvalidEncoding(format!("bech32: {e}")))
}

/// Decode a segwit address into (hrp, witness version, program).
pub fn decode(s: &str) -> Result<(String, u8, Vec<u8>), CryptoError> {
    let (hrp, version, program) =
        segwit::decode(s).map_err(|e| CryptoError::InvalidEncoding(format!("bech32: {e}")))?;
    Ok((hrp.to_lowercase(), version.to_u8(), program))
}
