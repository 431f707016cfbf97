//! # crypto-utils
//!
//! Hashing, Base58Check and segwit encodings, secp256k1 keys and the BIP-32
//! key tree shared by the wallet crates.

pub mod base58;
pub mod digest;
pub mod error;
pub mod hd;
pub mod secp256k1;
pub mod segwit;

pub use error::CryptoError;
pub use hd::{HdKey, HdNode, HARDENED_BIT};
pub use secp256k1::{PrivateKey, PublicKey};
