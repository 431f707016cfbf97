//! BIP-32 hierarchical deterministic key tree.
//!
//! A node is immutable once derived. Derivation and parsing failures are
//! returned as [`CryptoError`]; [`CryptoError::InvalidChildKey`] marks the
//! (astronomically rare) indices a caller should skip.

use std::fmt;

use zeroize::Zeroizing;

use crate::base58;
use crate::digest::{hash160, hmac_sha512};
use crate::error::CryptoError;
use crate::secp256k1::{PrivateKey, PublicKey};

/// Bit 31 marks a hardened child index.
pub const HARDENED_BIT: u32 = 0x8000_0000;

const ROOT_HMAC_KEY: &[u8] = b"Bitcoin seed";
const EXTENDED_KEY_SIZE: usize = 78;
const MAX_DEPTH: u8 = u8::MAX;

#[derive(Clone, Debug)]
pub enum HdKey {
    Private(PrivateKey),
    Public(PublicKey),
}

#[derive(Clone)]
pub struct HdNode {
    key: HdKey,
    chain_code: [u8; 32],
    depth: u8,
    index: u32,
    parent_fingerprint: [u8; 4],
    path: Vec<u32>,
}

impl HdNode {
    /// Master node from a seed: HMAC-SHA512("Bitcoin seed", seed).
    pub fn derive_root_node(seed: &[u8]) -> Result<Self, CryptoError> {
        let digest = Zeroizing::new(hmac_sha512(ROOT_HMAC_KEY, seed)?);
        let key = PrivateKey::from_bytes(&digest[..32], true)
            .map_err(|_| CryptoError::DerivationFailed("master key out of range".into()))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&digest[32..]);
        Ok(Self {
            key: HdKey::Private(key),
            chain_code,
            depth: 0,
            index: 0,
            parent_fingerprint: [0u8; 4],
            path: Vec::new(),
        })
    }

    /// Derive one level down. `index` may already carry [`HARDENED_BIT`];
    /// `hardened` forces it. With `private == false` the child is public-only.
    pub fn derive_child_node(
        &self,
        index: u32,
        hardened: bool,
        private: bool,
    ) -> Result<Self, CryptoError> {
        if self.depth == MAX_DEPTH {
            return Err(CryptoError::DerivationFailed("maximum depth reached".into()));
        }
        let index = if hardened { index | HARDENED_BIT } else { index };
        let private_key = self.private_key();
        if private && private_key.is_none() {
            return Err(CryptoError::DerivationFailed(
                "private child of a public node".into(),
            ));
        }

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if index & HARDENED_BIT != 0 {
            let key = private_key.ok_or_else(|| {
                CryptoError::DerivationFailed("hardened child of a public node".into())
            })?;
            data.push(0x00);
            data.extend_from_slice(&key.to_bytes()[..]);
        } else {
            data.extend_from_slice(&self.public_key().compressed_data());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let digest = Zeroizing::new(hmac_sha512(&self.chain_code, &data)?);
        let mut tweak = Zeroizing::new([0u8; 32]);
        tweak.copy_from_slice(&digest[..32]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&digest[32..]);

        let key = match (private_key, private) {
            (Some(key), true) => HdKey::Private(
                key.add_tweak(&tweak)
                    .map_err(|_| CryptoError::InvalidChildKey(index))?,
            ),
            _ => HdKey::Public(
                self.public_key()
                    .with_compressed(true)
                    .add_tweak(&tweak)
                    .map_err(|_| CryptoError::InvalidChildKey(index))?,
            ),
        };

        let mut path = self.path.clone();
        path.push(index);
        Ok(Self {
            key,
            chain_code,
            depth: self.depth + 1,
            index,
            parent_fingerprint: self.fingerprint(),
            path,
        })
    }

    /// Walk a parsed path from this node.
    pub fn derive_path(&self, path: &[u32], private: bool) -> Result<Self, CryptoError> {
        let mut node = self.clone();
        for &index in path {
            node = node.derive_child_node(index, false, private)?;
        }
        Ok(node)
    }

    /// Parse a Base58Check extended key, returning its version prefix.
    pub fn from_extended_key(encoded: &str) -> Result<(u32, Self), CryptoError> {
        let data = Zeroizing::new(base58::decode_check(encoded)?);
        if data.len() != EXTENDED_KEY_SIZE {
            return Err(CryptoError::InvalidEncoding(format!(
                "extended key must be {EXTENDED_KEY_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let version = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let depth = data[4];
        let mut parent_fingerprint = [0u8; 4];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let index = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);

        if depth == 0 && (parent_fingerprint != [0u8; 4] || index != 0) {
            return Err(CryptoError::InvalidEncoding(
                "root key with parent fingerprint or index".into(),
            ));
        }

        let key = if data[45] == 0x00 {
            HdKey::Private(PrivateKey::from_bytes(&data[46..], true)?)
        } else {
            HdKey::Public(PublicKey::from_bytes(&data[45..])?)
        };

        Ok((
            version,
            Self {
                key,
                chain_code,
                depth,
                index,
                parent_fingerprint,
                path: Vec::new(),
            },
        ))
    }

    /// Serialize as xprv (`private`) or xpub under `version`.
    pub fn to_extended_key(&self, version: u32, private: bool) -> Result<String, CryptoError> {
        let mut data = Zeroizing::new(Vec::with_capacity(EXTENDED_KEY_SIZE));
        data.extend_from_slice(&version.to_be_bytes());
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.index.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        if private {
            let key = self.private_key().ok_or_else(|| {
                CryptoError::InvalidPrivateKey("node holds a public key only".into())
            })?;
            data.push(0x00);
            data.extend_from_slice(&key.to_bytes()[..]);
        } else {
            data.extend_from_slice(&self.public_key().compressed_data());
        }
        Ok(base58::encode_check(&data))
    }

    /// The same node without its private key.
    pub fn to_public(&self) -> Self {
        Self {
            key: HdKey::Public(self.public_key()),
            ..self.clone()
        }
    }

    pub fn key(&self) -> &HdKey {
        &self.key
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            HdKey::Private(key) => Some(key),
            HdKey::Public(_) => None,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match &self.key {
            HdKey::Private(key) => key.public_key(),
            HdKey::Public(key) => key.clone(),
        }
    }

    /// HASH160 of the compressed public key.
    pub fn identifier(&self) -> [u8; 20] {
        hash160(&self.public_key().compressed_data())
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        let id = self.identifier();
        [id[0], id[1], id[2], id[3]]
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_hardened(&self) -> bool {
        self.index & HARDENED_BIT != 0
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    /// Indices from the root. Empty for nodes imported from an extended key.
    pub fn path(&self) -> &[u32] {
        &self.path
    }

    /// Attach the path an imported node was derived along. It must be as
    /// long as the node is deep and end at the node's index.
    pub fn with_path(mut self, path: Vec<u32>) -> Result<Self, CryptoError> {
        if path.len() != usize::from(self.depth) || path.last().is_some_and(|&i| i != self.index) {
            return Err(CryptoError::InvalidPath(format!(
                "{} does not lead to a depth {} node with index {}",
                path_to_string(&path),
                self.depth,
                self.index
            )));
        }
        self.path = path;
        Ok(self)
    }
}

impl PartialEq for HdNode {
    fn eq(&self, other: &Self) -> bool {
        self.chain_code == other.chain_code
            && self.depth == other.depth
            && self.index == other.index
            && self.parent_fingerprint == other.parent_fingerprint
            && self.public_key().compressed_data() == other.public_key().compressed_data()
    }
}

impl Eq for HdNode {}

impl fmt::Debug for HdNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdNode")
            .field("depth", &self.depth)
            .field("index", &self.index)
            .field("path", &path_to_string(&self.path))
            .field("private", &self.private_key().is_some())
            .finish_non_exhaustive()
    }
}

/// Parse "m/44'/0'/0'/0/1". The leading "m" is optional, hardened indices
/// take a `'`, `h` or `H` suffix or a `-` prefix (never both).
pub fn parse_path(path: &str) -> Result<Vec<u32>, CryptoError> {
    let invalid = || CryptoError::InvalidPath(path.to_string());
    let mut result = Vec::new();

    for (position, token) in path.split('/').enumerate() {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if position == 0 && (token == "m" || token == "M") {
            continue;
        }

        let (token, prefix_hardened) = match token.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        let (digits, suffix_hardened) = match token.strip_suffix(&['\'', 'h', 'H'][..]) {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        if prefix_hardened && suffix_hardened {
            return Err(invalid());
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: u64 = digits.parse().map_err(|_| invalid())?;
        let mut index = u32::try_from(value).map_err(|_| invalid())?;
        if prefix_hardened || suffix_hardened {
            if index & HARDENED_BIT != 0 {
                return Err(invalid());
            }
            index |= HARDENED_BIT;
        }
        result.push(index);
    }
    Ok(result)
}

/// Render indices as "m/84'/0'/0'/0/3".
pub fn path_to_string(path: &[u32]) -> String {
    let mut out = String::from("m");
    for &index in path {
        if index & HARDENED_BIT != 0 {
            out.push_str(&format!("/{}'", index & !HARDENED_BIT));
        } else {
            out.push_str(&format!("/{index}"));
        }
    }
    out
}
