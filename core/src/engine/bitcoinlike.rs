// Copyright (c) 2023-2024 The Coldsign Developers

//! Generic altcoin signer
//!
//! Covers Bitcoin-derived coins with minor protocol variations: BIP-143
//! forks sign single-pass with the fork id folded into the hash type,
//! everything else follows the legacy two-pass scheme. Unlike the
//! canonical signer, expiry fields are tolerated.

use coldsign_proto::sign_tx::SignTx;

use crate::coins::{CoinCaps, CoinInfo};

use super::{
    bitcoin::{Bitcoin, SigScheme},
    Error, Keychain, Resume, Step,
};

/// Altcoin signer, delegating to the canonical machine with a
/// coin-appropriate digest scheme
pub struct Bitcoinlike<'a, K: Keychain> {
    inner: Bitcoin<'a, K>,
}

impl<'a, K: Keychain> Bitcoinlike<'a, K> {
    /// Create a signer for a Bitcoin-derived altcoin
    pub fn new(msg: &SignTx, coin: &'static CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        let scheme = match coin.caps.contains(CoinCaps::FORCE_BIP143) {
            true => SigScheme::Bip143 {
                fork_id: coin.fork_id,
            },
            false => SigScheme::Legacy,
        };

        let inner = Bitcoin::with_scheme(msg, coin, keychain, scheme)?;

        Ok(Self { inner })
    }

    /// Advance the signer with the resume value answering its last step
    pub fn resume(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        self.inner.resume(res)
    }

    /// Fetch signing progress (n / 100)
    pub fn progress(&self) -> usize {
        self.inner.progress()
    }
}
