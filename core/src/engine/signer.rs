// Copyright (c) 2023-2024 The Coldsign Developers

//! Coin-capability dispatch over the signer implementations

use coldsign_proto::sign_tx::SignTx;

use crate::coins::CoinInfo;
#[cfg(feature = "altcoin")]
use crate::coins::{self, CoinCaps};

use super::{bitcoin::Bitcoin, Error, Keychain, Resume, Step};

#[cfg(feature = "altcoin")]
use super::{bitcoinlike::Bitcoinlike, decred::Decred, zcash::Overwintered};

/// Closed sum over the signer implementations
///
/// Selection is a strict, ordered, mutually exclusive dispatch on the
/// coin's capability flags; canonical-coin-only builds compile the
/// altcoin variants out entirely.
pub enum Signer<'a, K: Keychain> {
    /// Canonical Bitcoin-protocol signer
    Bitcoin(Bitcoin<'a, K>),

    /// Generic altcoin signer
    #[cfg(feature = "altcoin")]
    Bitcoinlike(Bitcoinlike<'a, K>),

    /// Decred signer
    #[cfg(feature = "altcoin")]
    Decred(Decred<'a, K>),

    /// Version-negotiated (Overwintered) signer
    #[cfg(feature = "altcoin")]
    Overwintered(Overwintered<'a, K>),
}

impl<'a, K: Keychain> Signer<'a, K> {
    /// Select and construct the signer for a coin
    pub fn for_coin(
        msg: &SignTx,
        coin: &'static CoinInfo,
        keychain: &'a K,
    ) -> Result<Self, Error> {
        #[cfg(feature = "altcoin")]
        {
            if coin.caps.contains(CoinCaps::DECRED) {
                return Decred::new(msg, coin, keychain).map(Signer::Decred);
            }
            if coin.caps.contains(CoinCaps::OVERWINTERED) {
                return Overwintered::new(msg, coin, keychain).map(Signer::Overwintered);
            }
            if !coins::is_native(coin.name) {
                return Bitcoinlike::new(msg, coin, keychain).map(Signer::Bitcoinlike);
            }
        }

        Bitcoin::new(msg, coin, keychain).map(Signer::Bitcoin)
    }

    /// Advance the signer with the resume value answering its last step;
    /// the opening call passes `None`
    pub fn resume(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        match self {
            Signer::Bitcoin(s) => s.resume(res),
            #[cfg(feature = "altcoin")]
            Signer::Bitcoinlike(s) => s.resume(res),
            #[cfg(feature = "altcoin")]
            Signer::Decred(s) => s.resume(res),
            #[cfg(feature = "altcoin")]
            Signer::Overwintered(s) => s.resume(res),
        }
    }

    /// Fetch signing progress (n / 100)
    pub fn progress(&self) -> usize {
        match self {
            Signer::Bitcoin(s) => s.progress(),
            #[cfg(feature = "altcoin")]
            Signer::Bitcoinlike(s) => s.progress(),
            #[cfg(feature = "altcoin")]
            Signer::Decred(s) => s.progress(),
            #[cfg(feature = "altcoin")]
            Signer::Overwintered(s) => s.progress(),
        }
    }

    /// Fetch the selected variant name
    pub fn name(&self) -> &'static str {
        match self {
            Signer::Bitcoin(..) => "Bitcoin",
            #[cfg(feature = "altcoin")]
            Signer::Bitcoinlike(..) => "Bitcoinlike",
            #[cfg(feature = "altcoin")]
            Signer::Decred(..) => "Decred",
            #[cfg(feature = "altcoin")]
            Signer::Overwintered(..) => "Overwintered",
        }
    }
}
