//! Wallet engine for Bitcoin-family coins.
//!
//! A [`Coin`] holds the HD purpose nodes derived from a mnemonic root, the
//! wallet's addresses with their UTXOs, and a [`TxFactory`] that selects
//! inputs, converges on a fee, and signs a payment. Persistence and network
//! I/O stay with the embedding application: coins serialize to JSON objects,
//! mempool queries are batched through [`MempoolCache`], and signed
//! transactions leave through a [`TxBroadcaster`].

pub mod broadcast;
pub mod coin;
pub mod config;
pub mod error;
pub mod hd_iterator;
pub mod mempool;
pub mod mnemonic;
pub mod serialize;
pub mod tx_factory;

pub use broadcast::{BroadcastCallback, BroadcastRequest, BroadcastResult, TxBroadcaster};
pub use coin::Coin;
pub use config::EngineConfig;
pub use error::{TxFactoryError, WalletError};
pub use hd_iterator::HdAddressIterator;
pub use mempool::{MempoolAddressList, MempoolCache};
pub use mnemonic::{generate_mnemonic, mnemonic_to_seed, root_node, validate_mnemonic};
pub use tx_factory::{FactoryTransaction, SelectedUtxoData, SpendableUtxo, TxFactory};

pub use chain_btc::{Address, AddressKind, CoinId, Utxo};

/// Open a coin from a mnemonic with the default engine configuration.
pub fn coin_from_mnemonic(id: CoinId, phrase: &str, passphrase: &str) -> Result<Coin, WalletError> {
    let root = root_node(phrase, passphrase)?;
    let mut coin = Coin::new(id);
    coin.derive_hd_nodes(&root)?;
    Ok(coin)
}
