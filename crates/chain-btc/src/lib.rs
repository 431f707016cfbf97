//! Bitcoin-family chain support for the wallet engine.
//!
//! Currency parameters, address codec, UTXO bookkeeping and coin selection,
//! and raw transaction building and signing for legacy and segwit spends.

pub mod address;
pub mod currency;
pub mod error;
pub mod network;
pub mod script;
pub mod selector;
pub mod transaction;
pub mod tx;
pub mod utxo;

pub use address::{Address, AddressKey, AddressKind, AddressType};
pub use currency::{Currency, FiatRate, Locale};
pub use error::BtcError;
pub use network::{CoinId, CoinParams};
pub use script::ScriptType;
pub use selector::{select_utxos, UtxoSelection};
pub use transaction::{InputKey, MutableInput, MutableOutput, MutableTransaction, SignedTransaction};
pub use tx::{Tx, TxIo};
pub use utxo::Utxo;
