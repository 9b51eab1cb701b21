// Copyright (c) 2023-2024 The Coldsign Developers

//! Transaction vectors for session tests

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{Multisig, TxInput, TxMeta, TxOutput},
};

/// Hardened derivation marker
pub const HARDENED: u32 = 0x8000_0000;

/// External (receive) path for a coin type
pub fn spend_path(coin: u32, index: u32) -> [u32; 5] {
    [44 | HARDENED, coin | HARDENED, HARDENED, 0, index]
}

/// Change path for a coin type
pub fn change_path(coin: u32, index: u32) -> [u32; 5] {
    [44 | HARDENED, coin | HARDENED, HARDENED, 1, index]
}

/// One scripted transaction: the opening request plus every input,
/// output and metadata payload the host will be asked for
#[derive(Clone)]
pub struct TxVector {
    pub coin: Option<&'static str>,
    pub version: u32,
    pub lock_time: u32,
    pub expiry: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub meta: Option<TxMeta>,
}

impl TxVector {
    /// Build the opening request for this vector
    pub fn sign_tx(&self) -> SignTx {
        let mut m = SignTx::new(
            self.coin,
            self.inputs.len() as u32,
            self.outputs.len() as u32,
        );
        m.version = self.version;
        m.lock_time = self.lock_time;
        m.expiry = self.expiry;
        m
    }

    /// Plain two-input spend with change on the canonical coin
    pub fn basic() -> Self {
        Self {
            coin: None,
            version: 1,
            lock_time: 0,
            expiry: 0,
            inputs: vec![
                TxInput::new(&spend_path(0, 0), [0x11; 32], 0, 100_000),
                TxInput::new(&spend_path(0, 1), [0x22; 32], 1, 50_000),
            ],
            outputs: vec![
                TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 140_000),
                TxOutput::to_path(&change_path(0, 0), 9_000),
            ],
            meta: None,
        }
    }

    /// Exercises every confirmation flow in one session: an external
    /// output, a foreign output path, a non-default lock time, a fee
    /// over the threshold, and the total
    pub fn checkpoint_gauntlet() -> Self {
        Self {
            coin: None,
            version: 1,
            lock_time: 500_000,
            expiry: 0,
            inputs: vec![TxInput::new(&spend_path(0, 0), [0x11; 32], 0, 1_000_000)],
            outputs: vec![
                TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 100_000),
                // Path outside the coin's derivation scheme
                TxOutput::to_path(&spend_path(2, 0), 50_000),
                TxOutput::to_path(&change_path(0, 0), 10_000),
            ],
            meta: None,
        }
    }

    /// Output with an address failing validation
    pub fn bad_address() -> Self {
        Self {
            outputs: vec![TxOutput::to_address("invalid", 99_000)],
            ..Self::single_input()
        }
    }

    /// Input with an inconsistent multisig descriptor
    pub fn multisig_invalid() -> Self {
        let mut v = Self::single_input();
        v.inputs[0].multisig = Some(Multisig { m: 4, n: 3 });
        v
    }

    /// Overwintered spend, negotiating version group and branch
    pub fn zcash() -> Self {
        Self {
            coin: Some("Zcash"),
            version: 4,
            lock_time: 0,
            expiry: 0,
            inputs: vec![TxInput::new(&spend_path(133, 0), [0x33; 32], 0, 100_000)],
            outputs: vec![TxOutput::to_address(
                "t1KYZBWNgKYvxy5DDZVJMHYjrmkfbLPTWc3",
                99_000,
            )],
            meta: Some(TxMeta {
                version_group_id: 0x892f2085,
                branch_id: 0x76b809bb,
                expiry: 0,
            }),
        }
    }

    /// Decred spend signed against the prefix commitment
    pub fn decred() -> Self {
        Self {
            coin: Some("Decred"),
            version: 1,
            lock_time: 0,
            expiry: 0,
            inputs: vec![
                TxInput::new(&spend_path(42, 0), [0x44; 32], 0, 100_000),
                TxInput::new(&spend_path(42, 1), [0x55; 32], 2, 100_000),
            ],
            outputs: vec![TxOutput::to_address(
                "DsQxuVRvS4eaJ42dhQEsCXauMWjvopWgrVg",
                195_000,
            )],
            meta: None,
        }
    }

    fn single_input() -> Self {
        Self {
            coin: None,
            version: 1,
            lock_time: 0,
            expiry: 0,
            inputs: vec![TxInput::new(&spend_path(0, 0), [0x11; 32], 0, 100_000)],
            outputs: vec![TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 99_000)],
            meta: None,
        }
    }
}
