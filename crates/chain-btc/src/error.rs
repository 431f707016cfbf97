use crypto_utils::CryptoError;
use thiserror::Error;

/// Bitcoin-family chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("utxo {utxo} is already bound to {address}")]
    UtxoAlreadyBound { utxo: String, address: String },

    #[error("no private key for address {0}")]
    MissingPrivateKey(String),

    #[error("input index {0} out of range")]
    InputIndexOutOfRange(usize),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
