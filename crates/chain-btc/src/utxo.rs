use crate::error::BtcError;
use crate::network::CoinId;
use crate::script::ScriptType;

/// A single unspent transaction output (UTXO).
///
/// The owning address is bound once, after which the UTXO can be spent with
/// that address's key. Equality ignores the binding and the script type.
#[derive(Debug, Clone)]
pub struct Utxo {
    coin: CoinId,
    /// Transaction ID as a hex string (big-endian / display order).
    name: String,
    index: u32,
    /// Block height, `-1` while unconfirmed.
    height: i64,
    amount: i64,
    script_type: Option<ScriptType>,
    address: Option<String>,
}

impl Utxo {
    pub fn new(coin: CoinId, name: impl Into<String>, index: u32, height: i64, amount: i64) -> Self {
        Self {
            coin,
            name: name.into(),
            index,
            height,
            amount,
            script_type: None,
            address: None,
        }
    }

    pub fn with_script_type(mut self, script_type: ScriptType) -> Self {
        self.script_type = Some(script_type);
        self
    }

    pub fn coin(&self) -> CoinId {
        self.coin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn script_type(&self) -> Option<ScriptType> {
        self.script_type
    }

    /// Name of the bound address, if any.
    pub fn address_name(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Bind to the owning address. The binding is set once; any later
    /// attempt fails, even for the same address.
    pub fn bind_address(
        &mut self,
        address_name: &str,
        default_script_type: ScriptType,
    ) -> Result<(), BtcError> {
        if let Some(bound) = &self.address {
            return Err(BtcError::UtxoAlreadyBound {
                utxo: format!("{}:{}", self.name, self.index),
                address: bound.clone(),
            });
        }
        self.address = Some(address_name.to_string());
        if self.script_type.is_none() {
            self.script_type = Some(default_script_type);
        }
        Ok(())
    }

    /// Serialized outpoint: txid in internal byte order, then the index.
    pub fn outpoint(&self) -> Result<Vec<u8>, BtcError> {
        let mut txid = hex::decode(&self.name)
            .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid hex: {e}")))?;
        if txid.len() != 32 {
            return Err(BtcError::TransactionBuildError(format!(
                "txid must be 32 bytes, got {}",
                txid.len()
            )));
        }
        txid.reverse();
        txid.extend_from_slice(&self.index.to_le_bytes());
        Ok(txid)
    }
}

impl PartialEq for Utxo {
    fn eq(&self, other: &Self) -> bool {
        self.coin == other.coin
            && self.name == other.name
            && self.height == other.height
            && self.index == other.index
            && self.amount == other.amount
    }
}

impl Eq for Utxo {}

impl AsRef<Utxo> for Utxo {
    fn as_ref(&self) -> &Utxo {
        self
    }
}
