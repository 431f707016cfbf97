//! JSON object (de)serialization of coins and their addresses.
//!
//! Integers are written natively and read either natively or from decimal
//! strings. HD address keys are stored as their derivation path, plus the
//! public extended key so they survive without the root. Loose private keys
//! are stored as WIF and loose public keys as hex.

use chain_btc::address::{Address, AddressKey, AddressKind};
use chain_btc::network::CoinId;
use chain_btc::script::ScriptType;
use chain_btc::tx::{Tx, TxIo};
use chain_btc::utxo::Utxo;
use crypto_utils::hd::{parse_path, path_to_string};
use crypto_utils::{HdNode, PrivateKey, PublicKey};
use serde_json::{Map, Value};
use tracing::warn;

use crate::coin::Coin;
use crate::error::WalletError;

pub type Object = Map<String, Value>;

fn invalid(field: &str, reason: impl Into<String>) -> WalletError {
    WalletError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn get_i64(map: &Object, field: &str) -> Result<Option<i64>, WalletError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(field, "not a 64-bit integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| invalid(field, e.to_string())),
        Some(_) => Err(invalid(field, "expected an integer")),
    }
}

fn get_u32(map: &Object, field: &str) -> Result<Option<u32>, WalletError> {
    get_i64(map, field)?
        .map(|v| u32::try_from(v).map_err(|_| invalid(field, "out of range")))
        .transpose()
}

fn get_bool(map: &Object, field: &str) -> Result<Option<bool>, WalletError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => get_i64(map, field).map(|v| v.map(|v| v != 0)),
    }
}

fn get_str<'a>(map: &'a Object, field: &str) -> Result<Option<&'a str>, WalletError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(field, "expected a string")),
    }
}

fn require_str<'a>(map: &'a Object, field: &str) -> Result<&'a str, WalletError> {
    get_str(map, field)?.ok_or_else(|| WalletError::MissingField(field.to_string()))
}

fn require_i64(map: &Object, field: &str) -> Result<i64, WalletError> {
    get_i64(map, field)?.ok_or_else(|| WalletError::MissingField(field.to_string()))
}

fn get_objects<'a>(map: &'a Object, field: &str) -> Result<Vec<&'a Object>, WalletError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().ok_or_else(|| invalid(field, "expected objects")))
            .collect(),
        Some(_) => Err(invalid(field, "expected an array")),
    }
}

// Utxo

pub fn serialize_utxo(utxo: &Utxo) -> Object {
    let mut map = Object::new();
    map.insert("name".into(), utxo.name().into());
    map.insert("index".into(), utxo.index().into());
    map.insert("height".into(), utxo.height().into());
    map.insert("amount".into(), utxo.amount().into());
    if let Some(script_type) = utxo.script_type() {
        map.insert("script_type".into(), script_type.name().into());
    }
    map
}

pub fn deserialize_utxo(coin: CoinId, map: &Object) -> Result<Utxo, WalletError> {
    let utxo = Utxo::new(
        coin,
        require_str(map, "name")?,
        get_u32(map, "index")?.ok_or_else(|| WalletError::MissingField("index".into()))?,
        get_i64(map, "height")?.unwrap_or(0),
        require_i64(map, "amount")?,
    );
    match get_str(map, "script_type")? {
        Some(name) => {
            let script_type =
                ScriptType::from_name(name).ok_or_else(|| invalid("script_type", name))?;
            Ok(utxo.with_script_type(script_type))
        }
        None => Ok(utxo),
    }
}

// Tx

fn serialize_io(io: &TxIo) -> Value {
    let mut map = Object::new();
    map.insert("address".into(), io.address.clone().into());
    map.insert("amount".into(), io.amount.into());
    Value::Object(map)
}

fn deserialize_io(map: &Object) -> Result<TxIo, WalletError> {
    Ok(TxIo::new(require_str(map, "address")?, require_i64(map, "amount")?))
}

pub fn serialize_tx(tx: &Tx) -> Object {
    let mut map = Object::new();
    map.insert("name".into(), tx.name.clone().into());
    map.insert("height".into(), tx.height.into());
    map.insert("time".into(), tx.time.into());
    map.insert("amount".into(), tx.amount.into());
    map.insert("fee_amount".into(), tx.fee_amount.into());
    map.insert("coinbase".into(), tx.coinbase.into());
    map.insert(
        "input_list".into(),
        Value::Array(tx.inputs.iter().map(serialize_io).collect()),
    );
    map.insert(
        "output_list".into(),
        Value::Array(tx.outputs.iter().map(serialize_io).collect()),
    );
    map
}

pub fn deserialize_tx(map: &Object) -> Result<Tx, WalletError> {
    let mut tx = Tx::new(
        require_str(map, "name")?,
        get_i64(map, "height")?.unwrap_or(-1),
        get_i64(map, "time")?.unwrap_or(0),
        get_i64(map, "amount")?.unwrap_or(0),
        get_i64(map, "fee_amount")?.unwrap_or(0),
    );
    tx.coinbase = get_bool(map, "coinbase")?.unwrap_or(false);
    tx.inputs = get_objects(map, "input_list")?
        .into_iter()
        .map(deserialize_io)
        .collect::<Result<_, _>>()?;
    tx.outputs = get_objects(map, "output_list")?
        .into_iter()
        .map(deserialize_io)
        .collect::<Result<_, _>>()?;
    Ok(tx)
}

// Address

pub fn serialize_address(address: &Address) -> Object {
    let mut map = Object::new();
    map.insert("name".into(), address.name().into());
    map.insert("type".into(), address.address_type().kind.name().into());
    map.insert("amount".into(), address.balance().into());
    map.insert("label".into(), address.label().into());
    map.insert("comment".into(), address.comment().into());
    map.insert("tx_count".into(), address.tx_count().into());
    map.insert(
        "history_first_offset".into(),
        address.history_first_offset().into(),
    );
    map.insert(
        "history_last_offset".into(),
        address.history_last_offset().into(),
    );

    match address.key() {
        Some(AddressKey::Hd(node)) => {
            if !node.path().is_empty() {
                map.insert("hd_path".into(), path_to_string(node.path()).into());
            }
            let params = address.coin().params();
            match node.to_extended_key(params.bip32_version_public, false) {
                Ok(xpub) => {
                    map.insert("extended_key".into(), xpub.into());
                }
                Err(e) => warn!(address = address.name(), error = %e, "cannot export extended key"),
            }
        }
        Some(AddressKey::Private(key)) => {
            let wif = key.to_wif(address.coin().params().wif_version);
            map.insert("private_key".into(), wif.into());
        }
        Some(AddressKey::Public(key)) => {
            map.insert("public_key".into(), hex::encode(key.data()).into());
        }
        None => {}
    }

    map.insert(
        "utxo_list".into(),
        Value::Array(
            address
                .utxo_list()
                .iter()
                .map(|u| Value::Object(serialize_utxo(u)))
                .collect(),
        ),
    );
    map.insert(
        "tx_list".into(),
        Value::Array(
            address
                .tx_list()
                .iter()
                .map(|t| Value::Object(serialize_tx(t)))
                .collect(),
        ),
    );
    map
}

impl Coin {
    fn deserialize_hd_key(&self, map: &Object) -> Result<Option<HdNode>, WalletError> {
        let path = get_str(map, "hd_path")?.map(parse_path).transpose()?;
        if let Some(path) = &path {
            for purpose in crate::coin::HD_PURPOSES {
                let Some(purpose_node) = self.hd_node(purpose) else {
                    continue;
                };
                if let Some(rest) = path.strip_prefix(purpose_node.path()) {
                    let private = purpose_node.private_key().is_some();
                    return Ok(Some(purpose_node.derive_path(rest, private)?));
                }
            }
        }
        match get_str(map, "extended_key")? {
            Some(encoded) => {
                let (version, node) = HdNode::from_extended_key(encoded)?;
                let params = self.params();
                if version != params.bip32_version_public && version != params.bip32_version_private {
                    return Err(invalid("extended_key", format!("unexpected version {version:#010x}")));
                }
                match path {
                    Some(path) => Ok(Some(node.with_path(path)?)),
                    None => Ok(Some(node)),
                }
            }
            None => Ok(None),
        }
    }

    fn deserialize_key(&self, map: &Object) -> Result<Option<AddressKey>, WalletError> {
        if let Some(node) = self.deserialize_hd_key(map)? {
            return Ok(Some(AddressKey::Hd(node)));
        }
        if let Some(wif) = get_str(map, "private_key")? {
            let (version, key) = PrivateKey::from_wif(wif)?;
            if version != self.params().wif_version {
                return Err(invalid("private_key", "WIF of another network"));
            }
            return Ok(Some(AddressKey::Private(key)));
        }
        if let Some(data) = get_str(map, "public_key")? {
            let bytes = hex::decode(data).map_err(|e| invalid("public_key", e.to_string()))?;
            return Ok(Some(AddressKey::Public(PublicKey::from_bytes(&bytes)?)));
        }
        Ok(None)
    }

    /// Rebuild an address of this coin. A stored key must reproduce the
    /// stored name.
    pub fn deserialize_address(&self, map: &Object) -> Result<Address, WalletError> {
        let name = require_str(map, "name")?;
        let mut address = if name == Address::null_data(self.id()).name() {
            Address::null_data(self.id())
        } else {
            Address::decode(self.id(), name)
                .ok_or_else(|| WalletError::InvalidAddress(name.to_string()))?
        };

        if let Some(kind) = get_str(map, "type")? {
            let kind = AddressKind::from_name(kind).ok_or_else(|| invalid("type", kind))?;
            if kind != address.address_type().kind {
                return Err(invalid("type", format!("{} does not match {name}", kind.name())));
            }
        }

        if let Some(key) = self.deserialize_key(map)? {
            let kind = address.address_type().kind;
            let derived = Address::create(self.id(), kind, key.clone())
                .ok_or_else(|| invalid("key", "cannot derive address"))?;
            if derived.name() != address.name() {
                return Err(invalid("key", format!("key does not match {name}")));
            }
            address = address.with_key(key);
        }

        address.set_label(get_str(map, "label")?.unwrap_or_default());
        address.set_comment(get_str(map, "comment")?.unwrap_or_default());
        let tx_count = get_i64(map, "tx_count")?.unwrap_or(0);
        address.set_tx_count(u64::try_from(tx_count).map_err(|_| invalid("tx_count", "negative"))?);
        address.set_history_first_offset(get_str(map, "history_first_offset")?.unwrap_or_default());
        address.set_history_last_offset(get_str(map, "history_last_offset")?.unwrap_or_default());

        let utxo_list = get_objects(map, "utxo_list")?
            .into_iter()
            .map(|u| deserialize_utxo(self.id(), u))
            .collect::<Result<Vec<_>, _>>()?;
        address.set_utxo_list(utxo_list)?;
        for tx in get_objects(map, "tx_list")? {
            address.append_tx(deserialize_tx(tx)?);
        }
        Ok(address)
    }

    pub fn serialize(&self) -> Object {
        let mut map = Object::new();
        map.insert("name".into(), self.short_name().into());
        map.insert("enabled".into(), self.is_enabled().into());
        map.insert("height".into(), self.height().into());
        map.insert("verified_height".into(), self.verified_height().into());
        map.insert("offset".into(), self.offset().into());
        map.insert("unverified_offset".into(), self.unverified_offset().into());
        map.insert("unverified_hash".into(), self.unverified_hash().into());
        map.insert(
            "address_list".into(),
            Value::Array(
                self.address_list()
                    .iter()
                    .map(|a| Value::Object(serialize_address(a)))
                    .collect(),
            ),
        );
        map
    }

    /// Load state saved by [`Coin::serialize`] into this coin. HD purpose
    /// nodes should be derived first so HD keys regain their private part.
    /// Addresses that fail to load are skipped with a warning.
    pub fn deserialize(&mut self, map: &Object) -> Result<(), WalletError> {
        let name = require_str(map, "name")?;
        if name != self.short_name() {
            return Err(WalletError::UnknownCoin(name.to_string()));
        }

        if let Some(enabled) = get_bool(map, "enabled")? {
            self.set_enabled(enabled);
        }
        if let Some(height) = get_i64(map, "height")? {
            self.set_height(height);
        }
        if let Some(height) = get_i64(map, "verified_height")? {
            self.set_verified_height(height);
        }
        if let Some(offset) = get_str(map, "offset")? {
            self.set_offset(offset);
        }
        if let Some(offset) = get_str(map, "unverified_offset")? {
            self.set_unverified_offset(offset);
        }
        if let Some(hash) = get_str(map, "unverified_hash")? {
            self.set_unverified_hash(hash);
        }

        for item in get_objects(map, "address_list")? {
            match self.deserialize_address(item) {
                Ok(address) => {
                    self.append_address(address);
                }
                Err(e) => warn!(coin = %self.id(), error = %e, "skipping stored address"),
            }
        }
        self.refresh_balance();
        self.refresh_utxo_list();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::root_node;
    use serde_json::json;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn object(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn integers_accept_strings() {
        let map = object(json!({"a": 5, "b": "-7", "c": "x", "d": 1.5}));
        assert_eq!(get_i64(&map, "a").unwrap(), Some(5));
        assert_eq!(get_i64(&map, "b").unwrap(), Some(-7));
        assert!(get_i64(&map, "c").is_err());
        assert!(get_i64(&map, "d").is_err());
        assert_eq!(get_i64(&map, "missing").unwrap(), None);
    }

    #[test]
    fn utxo_from_string_fields() {
        let map = object(json!({
            "name": "11".repeat(32),
            "index": "3",
            "height": "120",
            "amount": "5000",
            "script_type": "p2wpkh",
        }));
        let utxo = deserialize_utxo(CoinId::Bitcoin, &map).unwrap();
        assert_eq!(utxo.index(), 3);
        assert_eq!(utxo.height(), 120);
        assert_eq!(utxo.amount(), 5000);
        assert_eq!(utxo.script_type(), Some(ScriptType::P2wpkh));
        assert!(deserialize_utxo(CoinId::Bitcoin, &object(json!({"name": "00"}))).is_err());
    }

    #[test]
    fn tx_round_trip() {
        let mut tx = Tx::new("ab".repeat(32), 100, 1_600_000_000, -2000, 150);
        tx.inputs.push(TxIo::new("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", 5000));
        tx.outputs.push(TxIo::new("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", 2850));
        assert_eq!(deserialize_tx(&serialize_tx(&tx)).unwrap(), tx);
    }

    #[test]
    fn hd_address_regains_private_key() {
        let mut coin = Coin::new(CoinId::Bitcoin);
        coin.derive_hd_nodes(&root_node(ABANDON, "").unwrap()).unwrap();
        let address = coin.derive_hd_address(84, 0, false, Some(0)).unwrap();
        let map = serialize_address(&address);
        assert_eq!(map["hd_path"], json!("m/84'/0'/0'/0/0"));
        assert!(map["extended_key"].as_str().unwrap().starts_with("xpub"));

        let restored = coin.deserialize_address(&map).unwrap();
        assert!(!restored.is_read_only());

        let watch_only = Coin::new(CoinId::Bitcoin);
        let restored = watch_only.deserialize_address(&map).unwrap();
        assert!(restored.is_read_only());
        assert_eq!(restored.name(), address.name());
    }

    #[test]
    fn watch_only_hd_address_keeps_its_path() {
        let mut coin = Coin::new(CoinId::Bitcoin);
        coin.derive_hd_nodes(&root_node(ABANDON, "").unwrap()).unwrap();
        let address = coin.derive_hd_address(84, 0, false, Some(0)).unwrap();
        coin.append_address(address);
        let stored = coin.serialize();

        let mut watch_only = Coin::new(CoinId::Bitcoin);
        watch_only.deserialize(&stored).unwrap();
        assert!(watch_only.address_list()[0].is_read_only());
        let again = watch_only.serialize();
        assert_eq!(again["address_list"][0]["hd_path"], json!("m/84'/0'/0'/0/0"));
        assert_eq!(again, stored);

        watch_only.derive_hd_nodes(&root_node(ABANDON, "").unwrap()).unwrap();
        assert_eq!(watch_only.next_hd_index(84, 0, false), 1);
    }

    #[test]
    fn hd_path_must_match_extended_key() {
        let mut coin = Coin::new(CoinId::Bitcoin);
        coin.derive_hd_nodes(&root_node(ABANDON, "").unwrap()).unwrap();
        let mut map = serialize_address(&coin.derive_hd_address(84, 0, false, Some(0)).unwrap());
        map.insert("hd_path".into(), json!("m/84'/0'/0'/0/5"));
        assert!(Coin::new(CoinId::Bitcoin).deserialize_address(&map).is_err());
    }

    #[test]
    fn loose_keys_round_trip() {
        let coin = Coin::new(CoinId::Bitcoin);
        let key = PrivateKey::from_bytes(&[5; 32], false).unwrap();
        let legacy = Address::create(CoinId::Bitcoin, AddressKind::PubkeyHash, AddressKey::Private(key)).unwrap();
        let map = serialize_address(&legacy);
        assert!(map["private_key"].as_str().unwrap().starts_with('5'));
        let restored = coin.deserialize_address(&map).unwrap();
        assert!(!restored.private_key().unwrap().is_compressed());

        let public = PrivateKey::from_bytes(&[6; 32], true).unwrap().public_key();
        let watched = Address::create(CoinId::Bitcoin, AddressKind::ScriptHash, AddressKey::Public(public)).unwrap();
        let restored = coin.deserialize_address(&serialize_address(&watched)).unwrap();
        assert!(restored.is_read_only());
        assert_eq!(restored.address_type().script_type, ScriptType::P2shP2wpkh);
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let coin = Coin::new(CoinId::Bitcoin);
        let key = PrivateKey::from_bytes(&[5; 32], true).unwrap();
        let mut map = serialize_address(
            &Address::create(CoinId::Bitcoin, AddressKind::DEFAULT, AddressKey::Private(key)).unwrap(),
        );
        map.insert("name".into(), json!("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
        assert!(coin.deserialize_address(&map).is_err());
    }

    #[test]
    fn coin_name_must_match() {
        let mut coin = Coin::new(CoinId::Bitcoin);
        let map = Coin::new(CoinId::Litecoin).serialize();
        assert!(matches!(coin.deserialize(&map), Err(WalletError::UnknownCoin(_))));
    }
}
