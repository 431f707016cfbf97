//! Address codec: Base58Check and segwit address types per currency, plus
//! the wallet-side state an address carries (key, balance, UTXOs, history).

use std::cell::OnceCell;

use crypto_utils::digest::hash160;
use crypto_utils::{base58, segwit, HdNode, PrivateKey, PublicKey};

use crate::error::BtcError;
use crate::network::{CoinId, CoinParams};
use crate::script::{self, ScriptType};
use crate::tx::Tx;
use crate::utxo::Utxo;

const NULL_DATA_NAME: &str = "nulldata";
const BECH32_SEPARATOR: u8 = b'1';
/// Data part length (separator excluded) of v0 key-hash and script-hash names.
const P2WPKH_DATA_LENGTH: usize = 39;
const P2WSH_DATA_LENGTH: usize = 59;

fn is_unknown_witness_version(version: u8) -> bool {
    (1..=segwit::MAX_WITNESS_VERSION).contains(&version)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Null data, the pseudo-address of OP_RETURN outputs.
    Unknown,
    PubkeyHash,
    ScriptHash,
    WitnessV0KeyHash,
    WitnessV0ScriptHash,
    WitnessUnknown,
}

impl AddressKind {
    pub const DEFAULT: AddressKind = AddressKind::WitnessV0KeyHash;

    const ALL: [AddressKind; 6] = [
        AddressKind::Unknown,
        AddressKind::PubkeyHash,
        AddressKind::ScriptHash,
        AddressKind::WitnessV0KeyHash,
        AddressKind::WitnessV0ScriptHash,
        AddressKind::WitnessUnknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AddressKind::Unknown => "unknown",
            AddressKind::PubkeyHash => "p2pkh",
            AddressKind::ScriptHash => "p2sh",
            AddressKind::WitnessV0KeyHash => "p2wpkh",
            AddressKind::WitnessV0ScriptHash => "p2wsh",
            AddressKind::WitnessUnknown => "witness_unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// BIP-44 purpose of HD chains producing this kind.
    pub fn hd_purpose(self) -> Option<u32> {
        match self {
            AddressKind::PubkeyHash => Some(44),
            AddressKind::ScriptHash => Some(49),
            AddressKind::WitnessV0KeyHash => Some(84),
            _ => None,
        }
    }

    pub fn from_hd_purpose(purpose: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.hd_purpose() == Some(purpose))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressEncoding {
    None,
    Base58,
    Bech32,
}

/// Per-currency descriptor of an address kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressType {
    pub kind: AddressKind,
    /// Base58 version byte or witness version.
    pub version: u8,
    /// Payload size; negative means "1 up to |size| bytes".
    pub size: i32,
    pub encoding: AddressEncoding,
    pub is_witness: bool,
    /// Script a UTXO of this address is assumed to carry.
    pub script_type: ScriptType,
}

impl AddressType {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn accepts_size(&self, len: usize) -> bool {
        match self.size {
            size if size > 0 => len == size as usize,
            size if size < 0 => len > 0 && len <= size.unsigned_abs() as usize,
            _ => len == 0,
        }
    }
}

impl CoinParams {
    pub fn address_type(&self, kind: AddressKind) -> AddressType {
        let (version, size, encoding, is_witness, script_type) = match kind {
            AddressKind::Unknown => (0xff, 0, AddressEncoding::None, false, ScriptType::None),
            AddressKind::PubkeyHash => (
                self.pubkey_hash_version,
                20,
                AddressEncoding::Base58,
                false,
                ScriptType::P2pkh,
            ),
            AddressKind::ScriptHash => (
                self.script_hash_version,
                20,
                AddressEncoding::Base58,
                false,
                ScriptType::P2sh,
            ),
            AddressKind::WitnessV0KeyHash => {
                (0x00, 20, AddressEncoding::Bech32, true, ScriptType::P2wpkh)
            }
            AddressKind::WitnessV0ScriptHash => {
                (0x00, 32, AddressEncoding::Bech32, true, ScriptType::P2wsh)
            }
            AddressKind::WitnessUnknown => (
                0x00,
                -40,
                AddressEncoding::Bech32,
                true,
                ScriptType::WitnessUnknown,
            ),
        };
        AddressType {
            kind,
            version,
            size,
            encoding,
            is_witness,
            script_type,
        }
    }
}

/// Key material behind an address.
#[derive(Debug, Clone)]
pub enum AddressKey {
    Hd(HdNode),
    Private(PrivateKey),
    Public(PublicKey),
}

impl AddressKey {
    pub fn private_key(&self) -> Option<&PrivateKey> {
        match self {
            AddressKey::Hd(node) => node.private_key(),
            AddressKey::Private(key) => Some(key),
            AddressKey::Public(_) => None,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            AddressKey::Hd(node) => node.public_key(),
            AddressKey::Private(key) => key.public_key(),
            AddressKey::Public(key) => key.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Address {
    coin: CoinId,
    name: String,
    address_type: AddressType,
    key: Option<AddressKey>,
    hash: OnceCell<Vec<u8>>,
    balance: i64,
    label: String,
    comment: String,
    tx_count: u64,
    history_first_offset: String,
    history_last_offset: String,
    utxo_list: Vec<Utxo>,
    tx_list: Vec<Tx>,
}

impl Address {
    fn with_parts(coin: CoinId, name: String, address_type: AddressType, hash: Option<Vec<u8>>) -> Self {
        let cell = OnceCell::new();
        if let Some(hash) = hash {
            let _ = cell.set(hash);
        }
        Self {
            coin,
            name,
            address_type,
            key: None,
            hash: cell,
            balance: 0,
            label: String::new(),
            comment: String::new(),
            tx_count: 0,
            history_first_offset: String::new(),
            history_last_offset: String::new(),
            utxo_list: Vec::new(),
            tx_list: Vec::new(),
        }
    }

    /// Parse an address string for `coin`. Names of other currencies or
    /// networks never validate.
    pub fn decode(coin: CoinId, name: &str) -> Option<Self> {
        let params = coin.params();
        let hrp_len = params.bech32_hrp.len();
        if name.is_empty() || name.len() <= hrp_len + 1 {
            return None;
        }

        let first = name.chars().next()?;
        let kind = if params.pubkey_hash_prefixes.contains(&first) {
            AddressKind::PubkeyHash
        } else if params.script_hash_prefixes.contains(&first) {
            AddressKind::ScriptHash
        } else if name.as_bytes().get(hrp_len) != Some(&BECH32_SEPARATOR) {
            return None;
        } else {
            // v1+ programs can share the v0 data lengths.
            let kind = match name.len() - hrp_len - 1 {
                P2WPKH_DATA_LENGTH => AddressKind::WitnessV0KeyHash,
                P2WSH_DATA_LENGTH => AddressKind::WitnessV0ScriptHash,
                _ => AddressKind::WitnessUnknown,
            };
            return Self::decode_as(coin, kind, name).or_else(|| match kind {
                AddressKind::WitnessUnknown => None,
                _ => Self::decode_as(coin, AddressKind::WitnessUnknown, name),
            });
        };
        Self::decode_as(coin, kind, name)
    }

    fn decode_as(coin: CoinId, kind: AddressKind, name: &str) -> Option<Self> {
        let params = coin.params();
        let mut address_type = params.address_type(kind);

        let (name, payload) = match kind {
            AddressKind::PubkeyHash | AddressKind::ScriptHash => {
                let data = base58::decode_check(name).ok()?;
                let (&version, payload) = data.split_first()?;
                if version != address_type.version {
                    return None;
                }
                (name.to_string(), payload.to_vec())
            }
            AddressKind::WitnessV0KeyHash | AddressKind::WitnessV0ScriptHash => {
                let name = name.to_lowercase();
                let (hrp, version, program) = segwit::decode(&name).ok()?;
                if hrp != params.bech32_hrp || version != address_type.version {
                    return None;
                }
                (name, program)
            }
            AddressKind::WitnessUnknown => {
                let name = name.to_lowercase();
                let (hrp, version, program) = segwit::decode(&name).ok()?;
                if hrp != params.bech32_hrp || !is_unknown_witness_version(version) {
                    return None;
                }
                address_type.version = version;
                (name, program)
            }
            AddressKind::Unknown => return None,
        };

        if !address_type.accepts_size(payload.len()) {
            return None;
        }
        Some(Self::with_parts(coin, name, address_type, Some(payload)))
    }

    /// Derive an address of `kind` from a key. Segwit kinds need a
    /// compressed public key.
    pub fn create(coin: CoinId, kind: AddressKind, key: AddressKey) -> Option<Self> {
        let public_key = key.public_key();
        let key_hash = hash160(&public_key.data());
        let payload = match kind {
            AddressKind::PubkeyHash => key_hash.to_vec(),
            AddressKind::ScriptHash => {
                if !public_key.is_compressed() {
                    return None;
                }
                hash160(&script::witness_program_script(0, &key_hash)).to_vec()
            }
            AddressKind::WitnessV0KeyHash => {
                if !public_key.is_compressed() {
                    return None;
                }
                key_hash.to_vec()
            }
            _ => return None,
        };
        let mut address = Self::from_hash(coin, kind, &payload)?;
        if kind == AddressKind::ScriptHash {
            address.address_type.script_type = ScriptType::P2shP2wpkh;
        }
        address.key = Some(key);
        Some(address)
    }

    /// Encode a raw payload (key hash, script hash or v0 witness program).
    /// Unknown witness versions go through [`Self::from_witness_program`].
    pub fn from_hash(coin: CoinId, kind: AddressKind, payload: &[u8]) -> Option<Self> {
        if kind == AddressKind::WitnessUnknown {
            return None;
        }
        Self::encode_payload(coin, coin.params().address_type(kind), payload)
    }

    /// Encode a witness program of version 1 or above.
    pub fn from_witness_program(coin: CoinId, version: u8, program: &[u8]) -> Option<Self> {
        if !is_unknown_witness_version(version) {
            return None;
        }
        let mut address_type = coin.params().address_type(AddressKind::WitnessUnknown);
        address_type.version = version;
        Self::encode_payload(coin, address_type, program)
    }

    fn encode_payload(coin: CoinId, address_type: AddressType, payload: &[u8]) -> Option<Self> {
        let params = coin.params();
        if !address_type.accepts_size(payload.len()) {
            return None;
        }
        let name = match address_type.encoding {
            AddressEncoding::Base58 => {
                let mut data = Vec::with_capacity(payload.len() + 1);
                data.push(address_type.version);
                data.extend_from_slice(payload);
                base58::encode_check(&data)
            }
            AddressEncoding::Bech32 => {
                segwit::encode(params.bech32_hrp, address_type.version, payload).ok()?
            }
            AddressEncoding::None => return None,
        };
        Some(Self::with_parts(coin, name, address_type, Some(payload.to_vec())))
    }

    pub fn null_data(coin: CoinId) -> Self {
        let address_type = coin.params().address_type(AddressKind::Unknown);
        Self::with_parts(coin, NULL_DATA_NAME.to_string(), address_type, Some(Vec::new()))
    }

    /// Attach key material to an address restored from its name.
    pub fn with_key(mut self, key: AddressKey) -> Self {
        if self.address_type.kind == AddressKind::ScriptHash {
            self.address_type.script_type = ScriptType::P2shP2wpkh;
        }
        self.key = Some(key);
        self
    }

    pub fn coin(&self) -> CoinId {
        self.coin
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address_type(&self) -> &AddressType {
        &self.address_type
    }

    pub fn is_null_data(&self) -> bool {
        self.address_type.kind == AddressKind::Unknown
    }

    /// Decoded payload, computed from the name on first use. Empty when the
    /// name does not decode.
    pub fn hash(&self) -> &[u8] {
        self.hash.get_or_init(|| {
            Self::decode_as(self.coin, self.address_type.kind, &self.name)
                .and_then(|a| a.hash.into_inner())
                .unwrap_or_default()
        })
    }

    /// Output script paying to this address.
    pub fn script_pubkey(&self) -> Option<Vec<u8>> {
        let hash = self.hash();
        match self.address_type.kind {
            AddressKind::PubkeyHash if hash.len() == 20 => Some(script::p2pkh_script(hash)),
            AddressKind::ScriptHash if hash.len() == 20 => Some(script::p2sh_script(hash)),
            AddressKind::WitnessV0KeyHash | AddressKind::WitnessV0ScriptHash
                if !hash.is_empty() =>
            {
                Some(script::witness_program_script(0, hash))
            }
            AddressKind::WitnessUnknown => {
                let (_, version, program) = segwit::decode(&self.name).ok()?;
                Some(script::witness_program_script(version, &program))
            }
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&AddressKey> {
        self.key.as_ref()
    }

    pub fn hd_node(&self) -> Option<&HdNode> {
        match &self.key {
            Some(AddressKey::Hd(node)) => Some(node),
            _ => None,
        }
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.key.as_ref().and_then(AddressKey::private_key)
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.key.as_ref().map(AddressKey::public_key)
    }

    /// Without a private key the address can be watched but not spent.
    pub fn is_read_only(&self) -> bool {
        self.private_key().is_none()
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn utxo_list(&self) -> &[Utxo] {
        &self.utxo_list
    }

    /// Replace the UTXO set, binding each entry to this address. Fails
    /// without changes if any UTXO belongs to another address.
    pub fn set_utxo_list(&mut self, mut utxo_list: Vec<Utxo>) -> Result<(), BtcError> {
        for utxo in &mut utxo_list {
            utxo.bind_address(&self.name, self.address_type.script_type)?;
        }
        self.balance = utxo_list.iter().map(Utxo::amount).sum();
        self.utxo_list = utxo_list;
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    pub fn set_tx_count(&mut self, tx_count: u64) {
        self.tx_count = tx_count;
    }

    pub fn history_first_offset(&self) -> &str {
        &self.history_first_offset
    }

    pub fn set_history_first_offset(&mut self, offset: impl Into<String>) {
        self.history_first_offset = offset.into();
    }

    pub fn history_last_offset(&self) -> &str {
        &self.history_last_offset
    }

    pub fn set_history_last_offset(&mut self, offset: impl Into<String>) {
        self.history_last_offset = offset.into();
    }

    pub fn tx_list(&self) -> &[Tx] {
        &self.tx_list
    }

    /// Add a history entry. A known unconfirmed entry takes the new height
    /// and time; any other known entry is left alone and `false` returned.
    pub fn append_tx(&mut self, tx: Tx) -> bool {
        if let Some(existing) = self.tx_list.iter_mut().find(|t| t.name == tx.name) {
            if existing.height == -1 {
                existing.height = tx.height;
                existing.time = tx.time;
                return true;
            }
            return false;
        }
        self.tx_list.push(tx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one(compressed: bool) -> PrivateKey {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        PrivateKey::from_bytes(&bytes, compressed).unwrap()
    }

    #[test]
    fn genesis_p2pkh_decodes() {
        let address = Address::decode(CoinId::Bitcoin, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        assert_eq!(address.address_type().kind, AddressKind::PubkeyHash);
        assert_eq!(
            hex::encode(address.hash()),
            "62e907b15cbf27d5425399ebf6f0fb50ebb88f18"
        );
        assert!(address.is_read_only());
    }

    #[test]
    fn bip173_names_decode() {
        let p2wpkh =
            Address::decode(CoinId::Bitcoin, "BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").unwrap();
        assert_eq!(p2wpkh.address_type().kind, AddressKind::WitnessV0KeyHash);
        assert_eq!(p2wpkh.name(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");

        let p2wsh = Address::decode(
            CoinId::Bitcoin,
            "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3",
        )
        .unwrap();
        assert_eq!(p2wsh.address_type().kind, AddressKind::WitnessV0ScriptHash);
        assert_eq!(p2wsh.hash().len(), 32);

        let unknown = Address::decode(
            CoinId::Bitcoin,
            "bc1pw508d6qejxtdg4y5r3zarvary0c5xw7kw508d6qejxtdg4y5r3zarvary0c5xw7kt5nd6y",
        )
        .unwrap();
        assert_eq!(unknown.address_type().kind, AddressKind::WitnessUnknown);
        assert_eq!(unknown.hash().len(), 40);
        assert_eq!(unknown.script_pubkey().unwrap()[..2], [0x51, 40]);
    }

    #[test]
    fn created_addresses_match_known_names() {
        let p2wpkh = Address::create(
            CoinId::Bitcoin,
            AddressKind::WitnessV0KeyHash,
            AddressKey::Private(key_one(true)),
        )
        .unwrap();
        assert_eq!(p2wpkh.name(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert!(!p2wpkh.is_read_only());

        let p2pkh = Address::create(
            CoinId::Bitcoin,
            AddressKind::PubkeyHash,
            AddressKey::Private(key_one(true)),
        )
        .unwrap();
        assert_eq!(p2pkh.name(), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");

        let uncompressed = Address::create(
            CoinId::Bitcoin,
            AddressKind::PubkeyHash,
            AddressKey::Private(key_one(false)),
        )
        .unwrap();
        assert_eq!(uncompressed.name(), "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm");

        let testnet = Address::create(
            CoinId::BitcoinTest,
            AddressKind::WitnessV0KeyHash,
            AddressKey::Public(key_one(true).public_key()),
        )
        .unwrap();
        assert_eq!(testnet.name(), "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx");
        assert!(testnet.is_read_only());
    }

    #[test]
    fn segwit_needs_compressed_key() {
        for kind in [AddressKind::WitnessV0KeyHash, AddressKind::ScriptHash] {
            assert!(Address::create(
                CoinId::Bitcoin,
                kind,
                AddressKey::Private(key_one(false))
            )
            .is_none());
        }
    }

    #[test]
    fn nested_segwit_address() {
        let address = Address::create(
            CoinId::Bitcoin,
            AddressKind::ScriptHash,
            AddressKey::Private(key_one(true)),
        )
        .unwrap();
        assert!(address.name().starts_with('3'));
        assert_eq!(address.address_type().script_type, ScriptType::P2shP2wpkh);
        let redeem =
            hex::decode("0014751e76e8199196d454941c45d1b3a323f1433bd6").unwrap();
        assert_eq!(address.hash(), &hash160(&redeem)[..]);

        let decoded = Address::decode(CoinId::Bitcoin, address.name()).unwrap();
        assert_eq!(decoded.address_type().kind, AddressKind::ScriptHash);
        assert_eq!(decoded.address_type().script_type, ScriptType::P2sh);
    }

    #[test]
    fn every_kind_round_trips_on_every_coin() {
        let key = AddressKey::Private(key_one(true));
        for coin in CoinId::ALL {
            for kind in [
                AddressKind::PubkeyHash,
                AddressKind::ScriptHash,
                AddressKind::WitnessV0KeyHash,
            ] {
                let created = Address::create(coin, kind, key.clone()).unwrap();
                let decoded = Address::decode(coin, created.name()).unwrap();
                assert_eq!(decoded.address_type().kind, kind, "{coin} {kind:?}");
                assert_eq!(decoded.hash(), created.hash());
            }
            let p2wsh = Address::from_hash(coin, AddressKind::WitnessV0ScriptHash, &[7u8; 32]).unwrap();
            let decoded = Address::decode(coin, p2wsh.name()).unwrap();
            assert_eq!(decoded.address_type().kind, AddressKind::WitnessV0ScriptHash);

            assert!(Address::from_hash(coin, AddressKind::WitnessUnknown, &[7u8; 20]).is_none());
            assert!(Address::from_witness_program(coin, 0, &[7u8; 20]).is_none());
            assert!(Address::from_witness_program(coin, 17, &[7u8; 32]).is_none());

            for (version, program) in [(1u8, vec![7u8; 32]), (2, vec![9u8; 20]), (16, vec![3u8; 2])] {
                let unknown = Address::from_witness_program(coin, version, &program).unwrap();
                assert_eq!(unknown.address_type().version, version);
                let decoded = Address::decode(coin, unknown.name()).unwrap();
                assert_eq!(decoded.name(), unknown.name());
                assert_eq!(decoded.address_type().kind, AddressKind::WitnessUnknown, "{coin} v{version}");
                assert_eq!(decoded.address_type().version, version);
                assert_eq!(decoded.hash(), program.as_slice());
                assert_eq!(decoded.script_pubkey(), unknown.script_pubkey());
            }
        }
    }

    #[test]
    fn litecoin_prefixes() {
        let key = AddressKey::Private(key_one(true));
        let p2pkh = Address::create(CoinId::Litecoin, AddressKind::PubkeyHash, key.clone()).unwrap();
        assert!(p2pkh.name().starts_with('L'));
        let p2sh = Address::create(CoinId::Litecoin, AddressKind::ScriptHash, key.clone()).unwrap();
        assert!(p2sh.name().starts_with('M'));
        let p2wpkh =
            Address::create(CoinId::Litecoin, AddressKind::WitnessV0KeyHash, key).unwrap();
        assert!(p2wpkh.name().starts_with("ltc1q"));
    }

    #[test]
    fn networks_never_cross_validate() {
        let names = [
            (CoinId::Bitcoin, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"),
            (CoinId::Bitcoin, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"),
            (CoinId::BitcoinTest, "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"),
        ];
        for (owner, name) in names {
            for coin in CoinId::ALL {
                assert_eq!(Address::decode(coin, name).is_some(), coin == owner, "{name} on {coin}");
            }
        }
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert!(Address::decode(CoinId::Bitcoin, "").is_none());
        assert!(Address::decode(CoinId::Bitcoin, "bc1").is_none());
        assert!(Address::decode(CoinId::Bitcoin, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb").is_none());
        assert!(Address::decode(CoinId::Bitcoin, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").is_none());
        assert!(Address::decode(CoinId::Bitcoin, "xc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").is_none());
    }

    #[test]
    fn script_pubkeys() {
        let p2pkh = Address::decode(CoinId::Bitcoin, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH").unwrap();
        assert_eq!(
            hex::encode(p2pkh.script_pubkey().unwrap()),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
        let p2wpkh =
            Address::decode(CoinId::Bitcoin, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
        assert_eq!(
            hex::encode(p2wpkh.script_pubkey().unwrap()),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert!(Address::null_data(CoinId::Bitcoin).script_pubkey().is_none());
    }

    #[test]
    fn null_data_address() {
        let address = Address::null_data(CoinId::Litecoin);
        assert!(address.is_null_data());
        assert_eq!(address.name(), "nulldata");
        assert_eq!(address.address_type().encoding, AddressEncoding::None);
        assert!(address.hash().is_empty());
    }

    #[test]
    fn utxo_list_updates_balance_and_binds() {
        let mut address = Address::create(
            CoinId::Bitcoin,
            AddressKind::WitnessV0KeyHash,
            AddressKey::Private(key_one(true)),
        )
        .unwrap();
        let txid = "aa".repeat(32);
        address
            .set_utxo_list(vec![
                Utxo::new(CoinId::Bitcoin, txid.clone(), 0, 10, 1500),
                Utxo::new(CoinId::Bitcoin, txid.clone(), 1, 11, 2500),
            ])
            .unwrap();
        assert_eq!(address.balance(), 4000);
        assert!(address
            .utxo_list()
            .iter()
            .all(|u| u.address_name() == Some(address.name())
                && u.script_type() == Some(ScriptType::P2wpkh)));

        let mut foreign = Utxo::new(CoinId::Bitcoin, txid, 2, 12, 7);
        foreign.bind_address("elsewhere", ScriptType::P2pkh).unwrap();
        assert!(address.set_utxo_list(vec![foreign]).is_err());
        assert!(address.set_utxo_list(address.utxo_list().to_vec()).is_err());
        assert_eq!(address.balance(), 4000);
        assert_eq!(address.utxo_list().len(), 2);
    }

    #[test]
    fn append_tx_updates_pending_entry() {
        let mut address = Address::null_data(CoinId::Bitcoin);
        let pending = Tx::new("t1", -1, 0, 100, 1);
        assert!(address.append_tx(pending));
        assert!(address.append_tx(Tx::new("t1", 500, 1_600_000_000, 100, 1)));
        assert_eq!(address.tx_list()[0].height, 500);
        assert!(!address.append_tx(Tx::new("t1", 501, 0, 100, 1)));
        assert_eq!(address.tx_list().len(), 1);
    }

    #[test]
    fn kind_names_and_purposes() {
        assert_eq!(AddressKind::from_name("p2wpkh"), Some(AddressKind::WitnessV0KeyHash));
        assert_eq!(AddressKind::from_hd_purpose(44), Some(AddressKind::PubkeyHash));
        assert_eq!(AddressKind::from_hd_purpose(84), Some(AddressKind::DEFAULT));
        assert_eq!(AddressKind::from_hd_purpose(86), None);
    }
}
