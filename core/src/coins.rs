// Copyright (c) 2023-2024 The Coldsign Developers

//! Static per-coin capability descriptors driving signer selection

use crate::engine::Error;

bitflags::bitflags! {
    /// Coin capability flags
    pub struct CoinCaps: u8 {
        /// Decred transaction format (UTXO-commitment signing)
        const DECRED = 1 << 0;

        /// Overwintered transaction format (version-negotiated signing)
        const OVERWINTERED = 1 << 1;

        /// Coin requires BIP-143 style per-input digests for all inputs
        const FORCE_BIP143 = 1 << 2;
    }
}

/// Static descriptor for one supported coin
#[derive(Clone, Debug)]
pub struct CoinInfo {
    /// Coin name as carried in signing requests
    pub name: &'static str,

    /// SLIP-0044 coin type for derivation path checks
    pub slip44: u32,

    /// Capability flags
    pub caps: CoinCaps,

    /// Fee-per-kilobyte threshold above which an extra
    /// confirmation is required
    pub maxfee_kb: u64,

    /// Fork id folded into the hash type for BIP-143 forks
    pub fork_id: u8,
}

/// The platform's canonical coin, selected when a request
/// carries no coin name
pub const DEFAULT_COIN: &str = "Bitcoin";

/// Coins speaking the native Bitcoin protocol with no variations
const NATIVE_COINS: &[&str] = &["Bitcoin", "Regtest", "Testnet"];

/// Supported coin table
///
/// Parameters follow the upstream coin definitions; `maxfee_kb`
/// is denominated in the coin's base unit.
const COINS: &[CoinInfo] = &[
    CoinInfo {
        name: "Bitcoin",
        slip44: 0,
        caps: CoinCaps::empty(),
        maxfee_kb: 2_000_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Testnet",
        slip44: 1,
        caps: CoinCaps::empty(),
        maxfee_kb: 10_000_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Regtest",
        slip44: 1,
        caps: CoinCaps::empty(),
        maxfee_kb: 10_000_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Litecoin",
        slip44: 2,
        caps: CoinCaps::empty(),
        maxfee_kb: 40_000_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Bcash",
        slip44: 145,
        caps: CoinCaps::FORCE_BIP143,
        maxfee_kb: 500_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Decred",
        slip44: 42,
        caps: CoinCaps::DECRED,
        maxfee_kb: 1_000_000,
        fork_id: 0,
    },
    CoinInfo {
        name: "Zcash",
        slip44: 133,
        caps: CoinCaps::OVERWINTERED,
        maxfee_kb: 1_000_000,
        fork_id: 0,
    },
];

static_assertions::const_assert!(!COINS.is_empty());

/// Resolve a coin name to its [CoinInfo], defaulting to
/// [`DEFAULT_COIN`] when absent
pub fn by_name(name: Option<&str>) -> Result<&'static CoinInfo, Error> {
    let name = name.unwrap_or(DEFAULT_COIN);

    COINS
        .iter()
        .find(|c| c.name == name)
        .ok_or(Error::CoinUnknown)
}

/// Check whether a coin speaks the native Bitcoin protocol
/// (as opposed to an altcoin variation of it)
pub fn is_native(name: &str) -> bool {
    NATIVE_COINS.contains(&name)
}
