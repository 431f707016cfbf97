//! Per-currency parameters.
//!
//! Bitcoin, its test network and Litecoin differ only in constants, so each
//! one is a [`CoinParams`] value in a static registry rather than a type.

use std::fmt;

/// Handle into the currency registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoinId {
    Bitcoin,
    BitcoinTest,
    Litecoin,
}

/// Constants that distinguish one Bitcoin-family currency from another.
#[derive(Debug, PartialEq, Eq)]
pub struct CoinParams {
    pub id: CoinId,
    pub short_name: &'static str,
    pub full_name: &'static str,
    pub unit: &'static str,
    pub is_test_net: bool,
    /// BIP-44 `coin_type` level.
    pub bip44_coin_type: u32,
    pub bip32_version_public: u32,
    pub bip32_version_private: u32,
    pub wif_version: u8,
    pub pubkey_hash_version: u8,
    pub pubkey_hash_prefixes: &'static [char],
    pub script_hash_version: u8,
    pub script_hash_prefixes: &'static [char],
    pub bech32_hrp: &'static str,
    /// (minimum, maximum) fractional digits when formatting amounts.
    pub decimal_size: (usize, usize),
}

static BITCOIN: CoinParams = CoinParams {
    id: CoinId::Bitcoin,
    short_name: "btc",
    full_name: "Bitcoin",
    unit: "BTC",
    is_test_net: false,
    bip44_coin_type: 0,
    bip32_version_public: 0x0488_B21E,
    bip32_version_private: 0x0488_ADE4,
    wif_version: 0x80,
    pubkey_hash_version: 0x00,
    pubkey_hash_prefixes: &['1'],
    script_hash_version: 0x05,
    script_hash_prefixes: &['3'],
    bech32_hrp: "bc",
    decimal_size: (0, 8),
};

static BITCOIN_TEST: CoinParams = CoinParams {
    id: CoinId::BitcoinTest,
    short_name: "btctest",
    full_name: "Bitcoin Testnet",
    unit: "BTC",
    is_test_net: true,
    bip44_coin_type: 1,
    bip32_version_public: 0x0435_87CF,
    bip32_version_private: 0x0435_8394,
    wif_version: 0xEF,
    pubkey_hash_version: 0x6F,
    pubkey_hash_prefixes: &['m', 'n'],
    script_hash_version: 0xC4,
    script_hash_prefixes: &['2'],
    bech32_hrp: "tb",
    decimal_size: (0, 8),
};

static LITECOIN: CoinParams = CoinParams {
    id: CoinId::Litecoin,
    short_name: "ltc",
    full_name: "Litecoin",
    unit: "LTC",
    is_test_net: false,
    bip44_coin_type: 2,
    bip32_version_public: 0x0488_B21E,
    bip32_version_private: 0x0488_ADE4,
    wif_version: 0xB0,
    pubkey_hash_version: 0x30,
    pubkey_hash_prefixes: &['L'],
    script_hash_version: 0x32,
    script_hash_prefixes: &['M'],
    bech32_hrp: "ltc",
    decimal_size: (0, 8),
};

impl CoinId {
    pub const ALL: [CoinId; 3] = [CoinId::Bitcoin, CoinId::BitcoinTest, CoinId::Litecoin];

    pub fn params(self) -> &'static CoinParams {
        match self {
            CoinId::Bitcoin => &BITCOIN,
            CoinId::BitcoinTest => &BITCOIN_TEST,
            CoinId::Litecoin => &LITECOIN,
        }
    }

    /// Look a currency up by its short name ("btc", "btctest", "ltc").
    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.params().short_name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.params().short_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_resolve() {
        assert_eq!(CoinId::from_short_name("btc"), Some(CoinId::Bitcoin));
        assert_eq!(CoinId::from_short_name("BTCTEST"), Some(CoinId::BitcoinTest));
        assert_eq!(CoinId::from_short_name("ltc"), Some(CoinId::Litecoin));
        assert_eq!(CoinId::from_short_name("eth"), None);
    }

    #[test]
    fn params_point_back_to_their_id() {
        for id in CoinId::ALL {
            assert_eq!(id.params().id, id);
        }
    }

    #[test]
    fn bip44_coin_types() {
        assert_eq!(CoinId::Bitcoin.params().bip44_coin_type, 0);
        assert_eq!(CoinId::BitcoinTest.params().bip44_coin_type, 1);
        assert_eq!(CoinId::Litecoin.params().bip44_coin_type, 2);
    }

    #[test]
    fn only_testnet_is_flagged() {
        assert!(!CoinId::Bitcoin.params().is_test_net);
        assert!(CoinId::BitcoinTest.params().is_test_net);
        assert!(!CoinId::Litecoin.params().is_test_net);
    }

    #[test]
    fn display_names() {
        assert_eq!(CoinId::Bitcoin.to_string(), "btc");
        assert_eq!(CoinId::BitcoinTest.to_string(), "btctest");
        assert_eq!(CoinId::Litecoin.to_string(), "ltc");
    }
}
