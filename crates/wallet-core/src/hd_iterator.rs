//! Discovery of used HD receive addresses.
//!
//! For each index the iterator yields one address per HD purpose. The caller
//! looks each one up on the server and reports it back as empty or used. A
//! purpose is dropped after a run of empty addresses; empties followed by a
//! used address are gaps and get added to the coin too.

use std::collections::{BTreeMap, BTreeSet};

use chain_btc::address::Address;
use tracing::debug;

use crate::coin::{Coin, HD_PURPOSES};
use crate::error::WalletError;

#[derive(Debug, Clone)]
pub struct HdAddressIterator {
    account: u32,
    hd_index: u32,
    position: usize,
    empty_address_limit: usize,
    empty: BTreeMap<u32, Vec<Address>>,
    skipped: BTreeSet<u32>,
}

impl HdAddressIterator {
    pub fn new(coin: &Coin) -> Self {
        Self::starting_at(coin, 0)
    }

    pub fn starting_at(coin: &Coin, hd_index: u32) -> Self {
        Self {
            account: 0,
            hd_index,
            position: 0,
            empty_address_limit: coin.config().empty_address_limit.max(1),
            empty: BTreeMap::new(),
            skipped: BTreeSet::new(),
        }
    }

    pub fn hd_index(&self) -> u32 {
        self.hd_index
    }

    pub fn is_finished(&self, coin: &Coin) -> bool {
        HD_PURPOSES
            .iter()
            .all(|p| self.skipped.contains(p) || coin.hd_node(*p).is_none())
    }

    /// Next receive address to look up, or `None` once every purpose has
    /// been dropped.
    pub fn next_address(&mut self, coin: &Coin) -> Result<Option<Address>, WalletError> {
        loop {
            if self.is_finished(coin) {
                debug!(coin = %coin.id(), hd_index = self.hd_index, "hd iteration finished");
                return Ok(None);
            }
            while let Some(&purpose) = HD_PURPOSES.get(self.position) {
                self.position += 1;
                if self.skipped.contains(&purpose) || coin.hd_node(purpose).is_none() {
                    continue;
                }
                match coin.derive_hd_address(purpose, self.account, false, Some(self.hd_index)) {
                    Ok(address) => return Ok(Some(address)),
                    Err(WalletError::Crypto(crypto_utils::CryptoError::InvalidChildKey(_))) => continue,
                    Err(e) => return Err(e),
                }
            }
            self.position = 0;
            self.hd_index = self.hd_index.checked_add(1).ok_or_else(|| {
                WalletError::DerivationFailed("hd chain exhausted".into())
            })?;
        }
    }

    /// Record an address with no history.
    pub fn append_empty_address(&mut self, address: Address) {
        let Some(purpose) = address.address_type().kind.hd_purpose() else {
            return;
        };
        let list = self.empty.entry(purpose).or_default();
        list.push(address);
        if list.len() >= self.empty_address_limit && self.skipped.insert(purpose) {
            debug!(purpose, "empty address limit reached");
        }
    }

    /// Record an address with history: it and the empties before it on the
    /// same purpose join the coin.
    pub fn append_used_address(&mut self, coin: &mut Coin, address: Address) {
        if let Some(purpose) = address.address_type().kind.hd_purpose() {
            self.flush_empty_address_list(coin, purpose);
        }
        coin.append_address(address);
    }

    pub fn flush_empty_address_list(&mut self, coin: &mut Coin, purpose: u32) {
        if let Some(list) = self.empty.get_mut(&purpose) {
            for address in list.drain(..) {
                coin.append_address(address);
            }
        }
    }
}
