//! Engine tunables.

use serde::Deserialize;

use crate::error::WalletError;

pub const DEFAULT_FEE_AMOUNT_PER_BYTE: i64 = 103;
pub const DEFAULT_EMPTY_ADDRESS_LIMIT: usize = 6;
pub const DEFAULT_MEMPOOL_BATCH_SIZE: usize = 50;
pub const DEFAULT_PURPOSE: u32 = 84;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Fee rate in the smallest coin unit per virtual byte.
    #[serde(default = "default_fee_amount_per_byte")]
    pub fee_amount_per_byte: i64,
    /// Consecutive unused HD addresses after which discovery stops.
    #[serde(default = "default_empty_address_limit")]
    pub empty_address_limit: usize,
    /// Address names per mempool query.
    #[serde(default = "default_mempool_batch_size")]
    pub mempool_batch_size: usize,
    /// HD purpose used for new receive and change addresses.
    #[serde(default = "default_purpose")]
    pub default_purpose: u32,
}

fn default_fee_amount_per_byte() -> i64 {
    DEFAULT_FEE_AMOUNT_PER_BYTE
}

fn default_empty_address_limit() -> usize {
    DEFAULT_EMPTY_ADDRESS_LIMIT
}

fn default_mempool_batch_size() -> usize {
    DEFAULT_MEMPOOL_BATCH_SIZE
}

fn default_purpose() -> u32 {
    DEFAULT_PURPOSE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_amount_per_byte: DEFAULT_FEE_AMOUNT_PER_BYTE,
            empty_address_limit: DEFAULT_EMPTY_ADDRESS_LIMIT,
            mempool_batch_size: DEFAULT_MEMPOOL_BATCH_SIZE,
            default_purpose: DEFAULT_PURPOSE,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, WalletError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| WalletError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.fee_amount_per_byte < 0 {
            return Err(WalletError::InvalidConfig(format!(
                "fee_amount_per_byte must not be negative, got {}",
                self.fee_amount_per_byte
            )));
        }
        if self.mempool_batch_size == 0 {
            return Err(WalletError::InvalidConfig(
                "mempool_batch_size must be positive".into(),
            ));
        }
        if !matches!(self.default_purpose, 44 | 49 | 84) {
            return Err(WalletError::InvalidConfig(format!(
                "unsupported purpose {}",
                self.default_purpose
            )));
        }
        Ok(())
    }
}
