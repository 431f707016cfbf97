//! Transaction history records as reported by the server.

/// One side of a historical transaction: an address and the amount it
/// sent or received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIo {
    pub address: String,
    pub amount: i64,
}

impl TxIo {
    pub fn new(address: impl Into<String>, amount: i64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    /// Transaction ID, hex in display order.
    pub name: String,
    /// Block height, `-1` while in the mempool.
    pub height: i64,
    /// Block time as a unix timestamp, 0 while unknown.
    pub time: i64,
    pub amount: i64,
    pub fee_amount: i64,
    pub coinbase: bool,
    pub inputs: Vec<TxIo>,
    pub outputs: Vec<TxIo>,
}

impl Tx {
    pub fn new(name: impl Into<String>, height: i64, time: i64, amount: i64, fee_amount: i64) -> Self {
        Self {
            name: name.into(),
            height,
            time,
            amount,
            fee_amount,
            coinbase: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.height >= 0
    }

    /// Net effect of this transaction on `address_name`: received outputs
    /// minus spent inputs.
    pub fn amount_for(&self, address_name: &str) -> i64 {
        let received: i64 = self
            .outputs
            .iter()
            .filter(|io| io.address == address_name)
            .map(|io| io.amount)
            .sum();
        let spent: i64 = self
            .inputs
            .iter()
            .filter(|io| io.address == address_name)
            .map(|io| io.amount)
            .sum();
        received - spent
    }
}
