//! A wallet's view of one currency: its HD purpose nodes, address list,
//! aggregate balance, server sync state and the payment builder.

use std::collections::BTreeMap;

use chain_btc::address::{Address, AddressKey, AddressKind};
use chain_btc::currency::FiatRate;
use chain_btc::network::{CoinId, CoinParams};
use chain_btc::transaction::SignedTransaction;
use chain_btc::tx::Tx;
use chain_btc::utxo::Utxo;
use crypto_utils::{CryptoError, HdNode, HARDENED_BIT};
use tracing::{debug, warn};

use crate::broadcast::{BroadcastCallback, BroadcastRequest, TxBroadcaster};
use crate::config::EngineConfig;
use crate::error::WalletError;
use crate::mempool::{LocalHash, MempoolAddressList, MempoolCache};
use crate::tx_factory::TxFactory;

/// HD purposes a coin keeps nodes for.
pub const HD_PURPOSES: [u32; 3] = [44, 49, 84];

#[derive(Debug, Clone)]
pub struct Coin {
    id: CoinId,
    config: EngineConfig,
    enabled: bool,
    height: i64,
    verified_height: i64,
    offset: String,
    unverified_offset: String,
    unverified_hash: String,
    balance: i64,
    fiat_rate: FiatRate,
    address_list: Vec<Address>,
    hd_nodes: BTreeMap<u32, HdNode>,
    tx_factory: TxFactory,
    mempool: MempoolCache,
}

impl Coin {
    pub fn new(id: CoinId) -> Self {
        let config = EngineConfig::default();
        let mut tx_factory = TxFactory::new(id);
        tx_factory.set_fee_amount_per_byte(config.fee_amount_per_byte);
        Self {
            id,
            config,
            enabled: true,
            height: 0,
            verified_height: 0,
            offset: String::new(),
            unverified_offset: String::new(),
            unverified_hash: String::new(),
            balance: 0,
            fiat_rate: FiatRate::default(),
            address_list: Vec::new(),
            hd_nodes: BTreeMap::new(),
            tx_factory,
            mempool: MempoolCache::new(),
        }
    }

    pub fn with_config(id: CoinId, config: EngineConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let mut coin = Self::new(id);
        coin.tx_factory.set_fee_amount_per_byte(config.fee_amount_per_byte);
        coin.config = config;
        Ok(coin)
    }

    pub fn id(&self) -> CoinId {
        self.id
    }

    pub fn params(&self) -> &'static CoinParams {
        self.id.params()
    }

    pub fn short_name(&self) -> &'static str {
        self.params().short_name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, value: bool) {
        self.enabled = value;
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn set_height(&mut self, value: i64) {
        self.height = value;
    }

    pub fn verified_height(&self) -> i64 {
        self.verified_height
    }

    pub fn set_verified_height(&mut self, value: i64) {
        self.verified_height = value;
    }

    pub fn offset(&self) -> &str {
        &self.offset
    }

    pub fn set_offset(&mut self, value: impl Into<String>) {
        self.offset = value.into();
    }

    pub fn unverified_offset(&self) -> &str {
        &self.unverified_offset
    }

    pub fn set_unverified_offset(&mut self, value: impl Into<String>) {
        self.unverified_offset = value.into();
    }

    pub fn unverified_hash(&self) -> &str {
        &self.unverified_hash
    }

    pub fn set_unverified_hash(&mut self, value: impl Into<String>) {
        self.unverified_hash = value.into();
    }

    // HD keys

    /// Derive the `m/purpose'/coin_type'` nodes from a root node. The nodes
    /// are private when the root is.
    pub fn derive_hd_nodes(&mut self, root: &HdNode) -> Result<(), WalletError> {
        let private = root.private_key().is_some();
        let coin_type = self.params().bip44_coin_type;
        let mut nodes = BTreeMap::new();
        for purpose in HD_PURPOSES {
            let node = root
                .derive_child_node(purpose, true, private)?
                .derive_child_node(coin_type, true, private)?;
            nodes.insert(purpose, node);
        }
        self.hd_nodes = nodes;
        debug!(coin = %self.id, private, "hd purpose nodes derived");
        Ok(())
    }

    pub fn hd_node(&self, purpose: u32) -> Option<&HdNode> {
        self.hd_nodes.get(&purpose)
    }

    pub fn has_hd_nodes(&self) -> bool {
        !self.hd_nodes.is_empty()
    }

    /// Path prefix `m/purpose'/coin_type'/account'/change` of HD addresses.
    fn hd_chain_path(&self, purpose: u32, account: u32, change: bool) -> Option<Vec<u32>> {
        let mut path = self.hd_node(purpose)?.path().to_vec();
        path.push(account | HARDENED_BIT);
        path.push(change as u32);
        Some(path)
    }

    /// First unused index on an HD chain: one past the highest index of the
    /// known addresses derived on that chain.
    pub fn next_hd_index(&self, purpose: u32, account: u32, change: bool) -> u32 {
        let Some(prefix) = self.hd_chain_path(purpose, account, change) else {
            return 0;
        };
        self.address_list
            .iter()
            .filter_map(Address::hd_node)
            .filter_map(|node| match node.path().split_last() {
                Some((&index, parent)) if parent == prefix.as_slice() => Some(index),
                _ => None,
            })
            .map(|index| index.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Derive the address at `m/purpose'/coin_type'/account'/change/index`.
    /// Without an explicit index the next unused one is taken, skipping
    /// indices that produce no valid key.
    pub fn derive_hd_address(
        &self,
        purpose: u32,
        account: u32,
        change: bool,
        index: Option<u32>,
    ) -> Result<Address, WalletError> {
        let kind = AddressKind::from_hd_purpose(purpose).ok_or_else(|| {
            WalletError::DerivationFailed(format!("unsupported purpose {purpose}"))
        })?;
        let purpose_node = self.hd_node(purpose).ok_or_else(|| {
            WalletError::DerivationFailed(format!("no hd node for purpose {purpose}"))
        })?;
        let private = purpose_node.private_key().is_some();
        let chain_node = purpose_node
            .derive_child_node(account, true, private)?
            .derive_child_node(change as u32, false, private)?;

        let mut current = index.unwrap_or_else(|| self.next_hd_index(purpose, account, change));
        let node = loop {
            if current & HARDENED_BIT != 0 {
                return Err(WalletError::DerivationFailed("hd chain exhausted".into()));
            }
            match chain_node.derive_child_node(current, false, private) {
                Ok(node) => break node,
                Err(CryptoError::InvalidChildKey(skipped)) if index.is_none() => {
                    warn!(coin = %self.id, index = skipped, "invalid child key, skipping index");
                    current += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        Address::create(self.id, kind, AddressKey::Hd(node)).ok_or_else(|| {
            WalletError::DerivationFailed(format!("cannot create {} address", kind.name()))
        })
    }

    // Addresses

    pub fn address_list(&self) -> &[Address] {
        &self.address_list
    }

    /// Case-insensitive lookup of a trimmed name.
    pub fn find_address_by_name(&self, name: &str) -> Option<&Address> {
        let index = self.address_index(name)?;
        self.address_list.get(index)
    }

    fn address_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.address_list
            .iter()
            .position(|a| a.name().eq_ignore_ascii_case(name))
    }

    /// Add an address unless one with the same name is already known.
    pub fn append_address(&mut self, address: Address) -> bool {
        if address.coin() != self.id {
            warn!(coin = %self.id, address = address.name(), "address of another coin rejected");
            return false;
        }
        if self.address_index(address.name()).is_some() {
            return false;
        }
        let spendable = !address.is_read_only() && !address.utxo_list().is_empty();
        debug!(coin = %self.id, address = address.name(), "address appended");
        self.address_list.push(address);
        self.refresh_balance();
        if spendable {
            self.refresh_utxo_list();
        }
        true
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Recompute the coin balance from its spendable addresses.
    pub fn refresh_balance(&mut self) {
        self.balance = self
            .address_list
            .iter()
            .filter(|a| !a.is_read_only())
            .map(Address::balance)
            .sum();
    }

    /// Push the current spendable UTXO set into the payment builder.
    pub fn refresh_utxo_list(&mut self) {
        self.tx_factory.update_utxo_list(self.address_list.iter());
    }

    pub fn set_address_utxo_list(&mut self, name: &str, utxo_list: Vec<Utxo>) -> Result<(), WalletError> {
        let index = self
            .address_index(name)
            .ok_or_else(|| WalletError::InvalidAddress(name.to_string()))?;
        self.address_list[index].set_utxo_list(utxo_list)?;
        self.refresh_balance();
        self.refresh_utxo_list();
        Ok(())
    }

    pub fn append_address_tx(&mut self, name: &str, tx: Tx) -> Result<bool, WalletError> {
        let index = self
            .address_index(name)
            .ok_or_else(|| WalletError::InvalidAddress(name.to_string()))?;
        Ok(self.address_list[index].append_tx(tx))
    }

    /// Mutable access to an address's bookkeeping fields. Use
    /// [`Self::set_address_utxo_list`] to change its UTXOs.
    pub fn update_address<R>(&mut self, name: &str, f: impl FnOnce(&mut Address) -> R) -> Option<R> {
        let index = self.address_index(name)?;
        let balance = self.address_list[index].balance();
        let utxo_count = self.address_list[index].utxo_list().len();
        let result = f(&mut self.address_list[index]);
        let address = &self.address_list[index];
        if address.balance() != balance || address.utxo_list().len() != utxo_count {
            self.refresh_balance();
            self.refresh_utxo_list();
        }
        Some(result)
    }

    // Fiat

    pub fn fiat_rate(&self) -> FiatRate {
        self.fiat_rate
    }

    pub fn set_fiat_rate(&mut self, rate: FiatRate) {
        self.fiat_rate = rate;
    }

    /// Fiat value of `value`, or of the coin balance. Rounds down.
    pub fn to_fiat_amount(&self, value: Option<i64>) -> Option<i64> {
        let value = value.unwrap_or(self.balance);
        self.fiat_rate.to_fiat_amount(&self.params().currency(), value)
    }

    /// Coin amount worth `value` fiat. Rounds up.
    pub fn from_fiat_amount(&self, value: i64) -> Option<i64> {
        self.fiat_rate.from_fiat_amount(&self.params().currency(), value)
    }

    // Mempool

    /// Split the address list into mempool query batches. `None` uses the
    /// configured batch size.
    pub fn create_mempool_address_lists(&mut self, count_per_list: Option<usize>) -> Vec<MempoolAddressList> {
        let count_per_list = count_per_list.unwrap_or(self.config.mempool_batch_size);
        self.mempool
            .create_address_lists(self.address_list.iter().map(Address::name), count_per_list)
    }

    pub fn set_mempool_address_list_result(&mut self, local_hash: &LocalHash, remote_hash: &str) -> bool {
        self.mempool.set_result(local_hash, remote_hash)
    }

    // Payments

    pub fn tx_factory(&self) -> &TxFactory {
        &self.tx_factory
    }

    pub fn tx_factory_mut(&mut self) -> &mut TxFactory {
        &mut self.tx_factory
    }

    /// Build the pending payment, deriving a fresh change address on the
    /// default purpose when change is due.
    pub fn prepare_tx(&mut self) -> Result<(), WalletError> {
        let change_address = if self.tx_factory.change_amount() > 0 {
            Some(self.derive_hd_address(self.config.default_purpose, 0, true, None)?)
        } else {
            None
        };
        self.tx_factory.prepare(change_address)?;
        Ok(())
    }

    pub fn sign_tx(&mut self) -> Result<&SignedTransaction, WalletError> {
        Ok(self.tx_factory.sign()?)
    }

    /// Release the signed payment to `broadcaster`. The change address joins
    /// the address list and the factory is reset. Returns the transaction id.
    pub fn broadcast_tx(
        &mut self,
        broadcaster: &mut dyn TxBroadcaster,
        on_complete: BroadcastCallback,
    ) -> Result<String, WalletError> {
        let released = self.tx_factory.take_signed()?;
        if let Some(change_address) = released.change_address {
            self.append_address(change_address);
        }
        let request = BroadcastRequest::new(self.id, &released.transaction);
        let tx_name = request.tx_name.clone();
        debug!(coin = %self.id, tx = %tx_name, "broadcasting transaction");
        broadcaster.broadcast(request, on_complete);
        Ok(tx_name)
    }
}
