//! Payment builder: UTXO selection with fee convergence, then prepare,
//! sign and hand-off of a single outgoing transaction.
//!
//! The factory owns copies of everything it needs (spendable UTXOs with a
//! snapshot of their keys, receiver and change addresses), so it never
//! borrows the coin it belongs to. [`crate::coin::Coin`] wraps the steps
//! that need coin state, like deriving a fresh change address.

use chain_btc::address::{Address, AddressKey, AddressKind};
use chain_btc::currency::MAX_VALUE;
use chain_btc::network::CoinId;
use chain_btc::selector::select_utxos;
use chain_btc::transaction::{
    InputKey, MutableInput, MutableOutput, MutableTransaction, SignedTransaction,
};
use chain_btc::utxo::Utxo;
use crypto_utils::PrivateKey;
use tracing::{debug, error, warn};

use crate::config::DEFAULT_FEE_AMOUNT_PER_BYTE;
use crate::error::TxFactoryError;

/// Upper bound on selection rounds; the fee normally settles in two or three.
const MAX_FEE_ROUNDS: usize = 64;

/// A UTXO together with the key needed to spend it.
#[derive(Debug, Clone)]
pub struct SpendableUtxo {
    utxo: Utxo,
    key: InputKey,
}

impl SpendableUtxo {
    pub fn new(utxo: Utxo, key: InputKey) -> Self {
        Self { utxo, key }
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    fn to_input(&self) -> MutableInput {
        MutableInput::new(self.utxo.clone(), self.key.clone())
    }
}

impl AsRef<Utxo> for SpendableUtxo {
    fn as_ref(&self) -> &Utxo {
        &self.utxo
    }
}

/// Result of the last selection round. Sizes are those of the dummy
/// transaction and are zero when nothing covering was found.
#[derive(Debug, Clone, Default)]
pub struct SelectedUtxoData {
    pub list: Vec<SpendableUtxo>,
    pub amount: i64,
    pub raw_size: usize,
    pub virtual_size: usize,
}

impl SelectedUtxoData {
    pub fn is_valid(&self) -> bool {
        self.virtual_size > 0
    }
}

/// The transaction currently held by the factory.
#[derive(Debug, Clone)]
pub enum FactoryTransaction {
    Unsigned(MutableTransaction),
    Signed(SignedTransaction),
}

/// A signed transaction released by [`TxFactory::take_signed`].
#[derive(Debug, Clone)]
pub struct ReleasedTransaction {
    pub transaction: SignedTransaction,
    pub change_address: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct TxFactory {
    coin: CoinId,
    utxo_list: Vec<SpendableUtxo>,
    utxo_amount: i64,
    receiver_address: Option<Address>,
    receiver_amount: i64,
    subtract_fee: bool,
    fee_amount_per_byte: i64,
    selected: SelectedUtxoData,
    change_address: Option<Address>,
    transaction: Option<FactoryTransaction>,
    dummy_change_address: Option<Address>,
}

impl TxFactory {
    pub fn new(coin: CoinId) -> Self {
        Self {
            coin,
            utxo_list: Vec::new(),
            utxo_amount: 0,
            receiver_address: None,
            receiver_amount: 0,
            subtract_fee: false,
            fee_amount_per_byte: DEFAULT_FEE_AMOUNT_PER_BYTE,
            selected: SelectedUtxoData::default(),
            change_address: None,
            transaction: None,
            dummy_change_address: dummy_change_address(coin),
        }
    }

    pub fn coin(&self) -> CoinId {
        self.coin
    }

    /// Rebuild the spendable set from the UTXOs of non-read-only addresses.
    pub fn update_utxo_list<'a>(&mut self, addresses: impl IntoIterator<Item = &'a Address>) {
        self.utxo_list = addresses
            .into_iter()
            .filter(|a| !a.is_read_only())
            .flat_map(|address| {
                let key = InputKey::from_address(address);
                address
                    .utxo_list()
                    .iter()
                    .map(move |utxo| SpendableUtxo::new(utxo.clone(), key.clone()))
            })
            .collect();
        self.utxo_amount = self.utxo_list.iter().map(|u| u.utxo.amount()).sum();
        debug!(
            coin = %self.coin,
            utxos = self.utxo_list.len(),
            total = self.utxo_amount,
            "available utxos"
        );
        self.select_utxo_list(false);
    }

    pub fn utxo_list(&self) -> &[SpendableUtxo] {
        &self.utxo_list
    }

    pub fn available_amount(&self) -> i64 {
        self.utxo_amount
    }

    /// Set or clear (empty name) the receiver. An undecodable name clears the
    /// receiver and is reported as an error.
    pub fn set_receiver_address_name(&mut self, name: &str) -> Result<(), TxFactoryError> {
        let name = name.trim();
        self.receiver_address = if name.is_empty() {
            None
        } else {
            Address::decode(self.coin, name)
        };
        self.select_utxo_list(false);

        match &self.receiver_address {
            Some(address) => {
                debug!(receiver = address.name(), "receiver address set");
                Ok(())
            }
            None if name.is_empty() => Ok(()),
            None => {
                warn!(coin = %self.coin, name, "receiver address is invalid");
                Err(TxFactoryError::InvalidReceiverAddress(name.to_string()))
            }
        }
    }

    pub fn receiver_address(&self) -> Option<&Address> {
        self.receiver_address.as_ref()
    }

    pub fn receiver_amount(&self) -> i64 {
        self.receiver_amount
    }

    pub fn set_receiver_amount(&mut self, value: i64) {
        if self.receiver_amount != value {
            self.receiver_amount = value;
            self.select_utxo_list(false);
        }
    }

    /// Spend everything: select all UTXOs and set the receiver amount to
    /// what is left after the fee (or to the full total with subtract-fee).
    pub fn set_receiver_max_amount(&mut self) -> i64 {
        let value = if self.select_utxo_list(true) {
            let mut value = self.selected.amount;
            if !self.subtract_fee {
                value -= self.fee_amount();
            }
            value.max(0)
        } else {
            0
        };
        self.receiver_amount = value;
        value
    }

    pub fn subtract_fee(&self) -> bool {
        self.subtract_fee
    }

    pub fn set_subtract_fee(&mut self, value: bool) {
        if self.subtract_fee != value {
            self.subtract_fee = value;
            self.select_utxo_list(false);
        }
    }

    pub fn fee_amount_per_byte(&self) -> i64 {
        self.fee_amount_per_byte
    }

    pub fn set_fee_amount_per_byte(&mut self, value: i64) {
        if self.fee_amount_per_byte != value {
            self.fee_amount_per_byte = value;
            self.select_utxo_list(false);
        }
    }

    pub fn selected(&self) -> &SelectedUtxoData {
        &self.selected
    }

    pub fn fee_amount(&self) -> i64 {
        fee_for_size(self.fee_amount_per_byte, self.selected.virtual_size)
    }

    pub fn change_amount(&self) -> i64 {
        let mut change = self.selected.amount - self.receiver_amount;
        if !self.subtract_fee {
            change -= self.fee_amount();
        }
        change
    }

    pub fn is_valid_receiver_amount(&self) -> bool {
        self.receiver_amount >= 0 && self.change_amount() >= 0
    }

    pub fn is_valid_fee_amount(&self) -> bool {
        let fee = self.fee_amount();
        if fee < 0 || (self.subtract_fee && fee > self.receiver_amount) {
            return false;
        }
        self.change_amount() >= 0
    }

    pub fn is_valid_change_amount(&self) -> bool {
        self.change_amount() >= 0
    }

    pub fn change_address(&self) -> Option<&Address> {
        self.change_address.as_ref()
    }

    pub fn transaction(&self) -> Option<&FactoryTransaction> {
        self.transaction.as_ref()
    }

    /// Transaction id once signed.
    pub fn name(&self) -> Option<String> {
        match &self.transaction {
            Some(FactoryTransaction::Signed(tx)) => tx.name(),
            _ => None,
        }
    }

    /// Build the real transaction from the current selection. A change
    /// address must be supplied whenever [`Self::change_amount`] is positive.
    pub fn prepare(&mut self, change_address: Option<Address>) -> Result<(), TxFactoryError> {
        let receiver = self
            .receiver_address
            .as_ref()
            .ok_or(TxFactoryError::NoReceiver)?;
        if !self.is_valid_receiver_amount() {
            error!(amount = self.receiver_amount, "invalid receiver amount");
            if self.selected.list.is_empty() {
                return Err(TxFactoryError::InsufficientFunds {
                    required: self.receiver_amount,
                    available: self.utxo_amount,
                });
            }
            return Err(TxFactoryError::InvalidReceiverAmount(self.receiver_amount));
        }
        if !self.is_valid_fee_amount() {
            error!(fee = self.fee_amount(), "invalid fee amount");
            return Err(TxFactoryError::InvalidFeeAmount(self.fee_amount()));
        }
        if self.selected.list.is_empty() {
            error!("no input utxos selected");
            return Err(TxFactoryError::InsufficientFunds {
                required: self.receiver_amount,
                available: self.utxo_amount,
            });
        }

        let fee_amount = self.fee_amount();
        let change_amount = self.change_amount();
        let mut receiver_amount = self.receiver_amount;
        if self.subtract_fee {
            receiver_amount -= fee_amount;
        }

        let mut tx = MutableTransaction::new(0, false);
        for utxo in &self.selected.list {
            tx.add_input(utxo.to_input());
        }
        tx.add_output(MutableOutput::new(receiver, receiver_amount)?);

        let change_address = if change_amount > 0 {
            let address = change_address.ok_or(TxFactoryError::MissingChangeAddress(change_amount))?;
            tx.add_output(MutableOutput::new(&address, change_amount)?);
            Some(address)
        } else {
            None
        };

        if tx.fee_amount() != fee_amount {
            error!(
                expected = fee_amount,
                actual = tx.fee_amount(),
                "prepared fee differs from computed fee"
            );
            return Err(TxFactoryError::FeeMismatch {
                expected: fee_amount,
                actual: tx.fee_amount(),
            });
        }

        debug!(
            inputs = tx.inputs().len(),
            receiver_amount,
            change_amount,
            fee_amount,
            "transaction prepared"
        );
        self.change_address = change_address;
        self.transaction = Some(FactoryTransaction::Unsigned(tx));
        Ok(())
    }

    /// Sign the prepared transaction. A signed fee that differs from the
    /// computed one discards the transaction.
    pub fn sign(&mut self) -> Result<&SignedTransaction, TxFactoryError> {
        let tx = match &self.transaction {
            None => return Err(TxFactoryError::NotPrepared),
            Some(FactoryTransaction::Signed(_)) => return Err(TxFactoryError::AlreadySigned),
            Some(FactoryTransaction::Unsigned(tx)) => tx,
        };
        let signed = tx.sign()?;

        let expected = self.fee_amount();
        if signed.fee_amount() != expected {
            error!(
                expected,
                actual = signed.fee_amount(),
                "signed fee differs from computed fee, transaction discarded"
            );
            self.transaction = None;
            self.change_address = None;
            return Err(TxFactoryError::FeeMismatch {
                expected,
                actual: signed.fee_amount(),
            });
        }

        debug!(raw = %signed.to_hex(), "signed transaction");
        let signed = self.transaction.insert(FactoryTransaction::Signed(signed));
        match signed {
            FactoryTransaction::Signed(tx) => Ok(&*tx),
            FactoryTransaction::Unsigned(_) => Err(TxFactoryError::NotSigned),
        }
    }

    /// Release the signed transaction for broadcast and reset the factory.
    pub fn take_signed(&mut self) -> Result<ReleasedTransaction, TxFactoryError> {
        match self.transaction.take() {
            Some(FactoryTransaction::Signed(transaction)) => {
                let change_address = self.change_address.take();
                self.reset();
                Ok(ReleasedTransaction {
                    transaction,
                    change_address,
                })
            }
            other => {
                self.transaction = other;
                Err(TxFactoryError::NotSigned)
            }
        }
    }

    /// Drop the built transaction and change address. Idempotent.
    pub fn clear(&mut self) {
        self.change_address = None;
        self.transaction = None;
    }

    fn reset(&mut self) {
        self.clear();
        self.receiver_address = None;
        self.receiver_amount = 0;
        self.subtract_fee = false;
        self.selected = SelectedUtxoData::default();
    }

    /// Size of a dummy-signed transaction spending `list`, or `None` when
    /// there is nothing to spend or no receiver.
    fn estimate_sizes(&self, list: &[SpendableUtxo], amount: i64) -> Option<(usize, usize)> {
        let receiver = self.receiver_address.as_ref()?;
        if list.is_empty() {
            return None;
        }

        let mut tx = MutableTransaction::new(0, true);
        for utxo in list {
            tx.add_input(utxo.to_input());
        }
        tx.add_output(MutableOutput::new(receiver, MAX_VALUE).ok()?);
        if amount != self.receiver_amount || !self.subtract_fee {
            if let Some(change) = &self.dummy_change_address {
                tx.add_output(MutableOutput::new(change, MAX_VALUE).ok()?);
            }
        }

        match tx.sign() {
            Ok(signed) => Some((signed.raw_size(), signed.virtual_size())),
            Err(e) => {
                warn!(error = %e, "dummy signing failed");
                None
            }
        }
    }

    /// Re-run selection until the fee stops changing. Any built transaction
    /// is dropped since it no longer matches the selection.
    fn select_utxo_list(&mut self, select_all: bool) -> bool {
        self.clear();
        self.selected = SelectedUtxoData::default();

        if select_all {
            let list = self.utxo_list.clone();
            return match self.estimate_sizes(&list, self.utxo_amount) {
                Some((raw_size, virtual_size)) => {
                    self.selected = SelectedUtxoData {
                        list,
                        amount: self.utxo_amount,
                        raw_size,
                        virtual_size,
                    };
                    true
                }
                None => false,
            };
        }

        let mut fee_amount = 0;
        let mut result = None;
        for round in 0..MAX_FEE_ROUNDS {
            let mut target = self.receiver_amount.saturating_add(fee_amount);
            if target == 0 {
                target = 1;
            }
            let selection = select_utxos(&self.utxo_list, target);
            let list: Vec<SpendableUtxo> = selection
                .indices
                .iter()
                .map(|&i| self.utxo_list[i].clone())
                .collect();

            let Some((raw_size, virtual_size)) = self.estimate_sizes(&list, selection.amount) else {
                result = None;
                break;
            };
            result = Some(SelectedUtxoData {
                list,
                amount: selection.amount,
                raw_size,
                virtual_size,
            });
            if self.subtract_fee {
                break;
            }

            let new_fee_amount = fee_for_size(self.fee_amount_per_byte, virtual_size);
            debug!(round, fee_amount, new_fee_amount, "fee convergence");
            if new_fee_amount == fee_amount {
                break;
            }
            fee_amount = new_fee_amount;
            if round + 1 == MAX_FEE_ROUNDS {
                warn!(fee_amount, "fee did not converge");
            }
        }

        match result {
            Some(selected) => {
                self.selected = selected;
                true
            }
            None => false,
        }
    }
}

fn fee_for_size(fee_amount_per_byte: i64, virtual_size: usize) -> i64 {
    if virtual_size == 0 {
        return 0;
    }
    fee_amount_per_byte.saturating_mul(virtual_size as i64)
}

/// Address of the public key `1·G`, only used to size dummy change outputs.
fn dummy_change_address(coin: CoinId) -> Option<Address> {
    let mut one = [0u8; 32];
    one[31] = 1;
    let public_key = PrivateKey::from_bytes(&one, true).ok()?.public_key();
    let address = Address::create(coin, AddressKind::DEFAULT, AddressKey::Public(public_key));
    if address.is_none() {
        error!(coin = %coin, "failed to derive dummy change address");
    }
    address
}
