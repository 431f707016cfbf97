//! Hand-off of signed transactions to the network layer.
//!
//! The engine never talks to a server itself. A [`TxBroadcaster`] receives
//! the raw transaction and reports back through a one-shot callback.

use chain_btc::network::CoinId;
use chain_btc::transaction::SignedTransaction;

/// Server error code for a rejected broadcast.
pub const BROADCAST_ERROR_CODE: i32 = 2003;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub coin: CoinId,
    pub tx_name: String,
    pub raw_hex: String,
}

impl BroadcastRequest {
    pub fn new(coin: CoinId, transaction: &SignedTransaction) -> Self {
        Self {
            coin,
            tx_name: transaction.name().unwrap_or_default(),
            raw_hex: transaction.to_hex(),
        }
    }
}

/// Completion of a broadcast. `error_code` is zero on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResult {
    pub tx_name: String,
    pub error_code: i32,
    pub message: Option<String>,
}

impl BroadcastResult {
    pub fn accepted(tx_name: impl Into<String>) -> Self {
        Self {
            tx_name: tx_name.into(),
            error_code: 0,
            message: None,
        }
    }

    pub fn rejected(tx_name: impl Into<String>, error_code: i32, message: impl Into<String>) -> Self {
        Self {
            tx_name: tx_name.into(),
            error_code,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_code == 0
    }
}

pub type BroadcastCallback = Box<dyn FnOnce(BroadcastResult) + Send>;

/// Network collaborator that relays a signed transaction.
///
/// Implementations must call `on_complete` exactly once, possibly later and
/// from another thread.
pub trait TxBroadcaster {
    fn broadcast(&mut self, request: BroadcastRequest, on_complete: BroadcastCallback);
}
