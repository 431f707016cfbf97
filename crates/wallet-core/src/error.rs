use chain_btc::error::BtcError;
use crypto_utils::error::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown coin: {0}")]
    UnknownCoin(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Btc(#[from] BtcError),

    #[error(transparent)]
    TxFactory(#[from] TxFactoryError),
}

/// Failures of the payment builder. None of them leave partial state behind.
#[derive(Debug, Error)]
pub enum TxFactoryError {
    #[error("Invalid receiver address: {0}")]
    InvalidReceiverAddress(String),

    #[error("No receiver address set")]
    NoReceiver,

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Invalid receiver amount: {0}")]
    InvalidReceiverAmount(i64),

    #[error("Invalid fee amount: {0}")]
    InvalidFeeAmount(i64),

    #[error("Change address required for change of {0}")]
    MissingChangeAddress(i64),

    #[error("Transaction not prepared")]
    NotPrepared,

    #[error("Transaction already signed")]
    AlreadySigned,

    #[error("Transaction not signed")]
    NotSigned,

    #[error("Signed fee {actual} differs from computed fee {expected}")]
    FeeMismatch { expected: i64, actual: i64 },

    #[error(transparent)]
    Transaction(#[from] BtcError),
}
