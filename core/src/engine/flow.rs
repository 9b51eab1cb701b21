// Copyright (c) 2023-2024 The Coldsign Developers

//! Collection-phase state shared by the signer implementations
//!
//! [`TxFlow`] owns the totals, change detection, stream commitments and
//! validation rules common to every coin family; the per-coin machines
//! drive it and layer their own signing passes on top.

use zeroize::Zeroize;

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{OutputScriptType, SignedInput, TxInput, TxOutput},
    DerivationPath,
};

use crate::coins::CoinInfo;

use super::{digest::TxDigest, Confirm, Error, Keychain, KeyNode};

/// Hardened derivation marker
const HARDENED: u32 = 0x8000_0000;

/// Purposes recognised for device-owned paths
const PURPOSES: &[u32] = &[44 | HARDENED, 49 | HARDENED, 84 | HARDENED];

/// Rough serialized size estimate factors (bytes per element)
const SIZE_BASE: u64 = 10;
const SIZE_INPUT: u64 = 149;
const SIZE_OUTPUT: u64 = 35;

/// How a collected output is to be handled
pub(crate) enum OutputDisposition {
    /// Change back to the device, no confirmation required
    Change,

    /// External spend, the user reviews amount and destination
    External(Confirm),

    /// Path-addressed output that is not a recognised change path,
    /// the user is warned
    Foreign(Confirm),
}

/// Per-session transaction collection state
pub(crate) struct TxFlow<'a, K: Keychain> {
    pub coin: &'static CoinInfo,
    pub keychain: &'a K,

    pub inputs_count: u32,
    pub outputs_count: u32,
    pub version: u32,
    pub lock_time: u32,
    pub expiry: u32,

    pub total_in: u64,
    pub total_out: u64,
    pub change_out: u64,

    // Stream commitments, sealed after collection
    h_inputs: TxDigest,
    h_outputs: TxDigest,
    inputs_hash: [u8; 32],
    outputs_hash: [u8; 32],
    fee: u64,
}

impl<'a, K: Keychain> TxFlow<'a, K> {
    /// Create collection state for a signing request
    pub fn new(msg: &SignTx, coin: &'static CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        if msg.inputs_count == 0 {
            return Err(Error::data("Transaction has no inputs"));
        }
        if msg.outputs_count == 0 {
            return Err(Error::data("Transaction has no outputs"));
        }

        Ok(Self {
            coin,
            keychain,
            inputs_count: msg.inputs_count,
            outputs_count: msg.outputs_count,
            version: msg.version,
            lock_time: msg.lock_time,
            expiry: msg.expiry,
            total_in: 0,
            total_out: 0,
            change_out: 0,
            h_inputs: TxDigest::commitment(),
            h_outputs: TxDigest::commitment(),
            inputs_hash: [0u8; 32],
            outputs_hash: [0u8; 32],
            fee: 0,
        })
    }

    /// Validate and collect one streamed input
    pub fn add_input(&mut self, input: &TxInput) -> Result<(), Error> {
        if input.address_n.is_empty() {
            return Err(Error::Address("Missing derivation path"));
        }
        if input.amount == 0 {
            return Err(Error::data("Invalid input amount"));
        }

        if let Some(m) = &input.multisig {
            if m.m == 0 || m.n == 0 || m.m > m.n || m.n > 15 {
                return Err(Error::Multisig("Invalid multisig parameters"));
            }
        }

        self.total_in = self
            .total_in
            .checked_add(input.amount)
            .ok_or(Error::data("Total amount overflow"))?;

        self.h_inputs.input(input);

        Ok(())
    }

    /// Validate and collect one streamed output, returning its
    /// confirmation disposition
    pub fn add_output(&mut self, n: u32, output: &TxOutput) -> Result<OutputDisposition, Error> {
        let addressed = !output.address.is_empty();
        let pathed = !output.address_n.is_empty();

        match output.script_type {
            OutputScriptType::OpReturn => {
                if output.amount != 0 {
                    return Err(Error::Script("OP_RETURN output with non-zero amount"));
                }
                if addressed || pathed {
                    return Err(Error::Script("OP_RETURN output with address"));
                }
            }
            _ => {
                if addressed && pathed {
                    return Err(Error::Address("Output address and path are mutually exclusive"));
                }
                if !addressed && !pathed {
                    return Err(Error::Address("Missing address"));
                }
                if addressed && !address_well_formed(&output.address) {
                    return Err(Error::Address("Invalid address"));
                }
            }
        }

        self.total_out = self
            .total_out
            .checked_add(output.amount)
            .ok_or(Error::data("Total amount overflow"))?;

        self.h_outputs.output(output);

        // Path-addressed outputs are change when they match the device's
        // derivation scheme, a warning otherwise
        if pathed {
            if self.is_change_path(&output.address_n) {
                self.change_out += output.amount;
                return Ok(OutputDisposition::Change);
            }

            return Ok(OutputDisposition::Foreign(Confirm::ForeignAddress {
                address_n: output.address_n.clone(),
            }));
        }

        Ok(OutputDisposition::External(Confirm::Output {
            index: n,
            address: output.address.clone(),
            amount: output.amount,
        }))
    }

    /// Seal the collection phase: fix the stream commitments and
    /// check the transaction balances
    pub fn seal(&mut self) -> Result<(), Error> {
        self.fee = self
            .total_in
            .checked_sub(self.total_out)
            .ok_or(Error::Signing(
                super::FaultCode::NotEnoughFunds,
                "Not enough funds",
            ))?;

        self.inputs_hash = self.h_inputs.finalize_reset();
        self.outputs_hash = self.h_outputs.finalize_reset();

        Ok(())
    }

    /// Transaction fee (valid after [`TxFlow::seal`])
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Amount leaving the wallet, fee included
    pub fn spending(&self) -> u64 {
        self.total_in - self.change_out
    }

    /// Check whether the fee exceeds the coin's per-kilobyte threshold
    /// scaled by the estimated serialized size
    pub fn fee_over_threshold(&self) -> bool {
        let est_size = SIZE_BASE
            + SIZE_INPUT * self.inputs_count as u64
            + SIZE_OUTPUT * self.outputs_count as u64;

        self.fee > self.coin.maxfee_kb * est_size / 1000
    }

    /// Sealed commitment over the streamed inputs
    pub fn inputs_hash(&self) -> &[u8; 32] {
        &self.inputs_hash
    }

    /// Sealed commitment over the streamed outputs
    pub fn outputs_hash(&self) -> &[u8; 32] {
        &self.outputs_hash
    }

    /// Derive the key for an input and sign its digest,
    /// wiping the key node after use
    pub fn sign_input(
        &self,
        address_n: &DerivationPath,
        digest: [u8; 32],
        index: u32,
    ) -> Result<SignedInput, Error> {
        if address_n.is_empty() {
            return Err(Error::Address("Missing derivation path"));
        }

        let mut node = self.keychain.derive(address_n);
        let signature = node.sign(&digest);
        node.zeroize();

        Ok(SignedInput {
            input_index: index,
            signature,
        })
    }

    /// Check whether a path is a change path for this coin
    /// (`purpose' / coin' / account' / 1 / index`)
    pub fn is_change_path(&self, p: &[u32]) -> bool {
        self.path_internal(p) && p[3] == 1
    }

    /// Check whether a path belongs to this coin's derivation scheme
    fn path_internal(&self, p: &[u32]) -> bool {
        p.len() == 5 && PURPOSES.contains(&p[0]) && p[1] == self.coin.slip44 | HARDENED
    }
}

/// Surface-level address sanity check; full validation is the
/// address codec's concern downstream
fn address_well_formed(address: &str) -> bool {
    address.len() >= 26 && address.bytes().all(|b| b.is_ascii_graphic())
}

#[cfg(test)]
mod test {
    use coldsign_proto::tx::Multisig;

    use crate::coins;
    use crate::engine::test::TestKeychain;

    use super::*;

    fn flow(keychain: &TestKeychain) -> TxFlow<'_, TestKeychain> {
        let msg = SignTx::new(None, 2, 2);
        TxFlow::new(&msg, coins::by_name(None).unwrap(), keychain).unwrap()
    }

    #[test]
    fn empty_transaction_rejected() {
        let k = TestKeychain::new();
        let coin = coins::by_name(None).unwrap();

        assert!(TxFlow::new(&SignTx::new(None, 0, 1), coin, &k).is_err());
        assert!(TxFlow::new(&SignTx::new(None, 1, 0), coin, &k).is_err());
    }

    #[test]
    fn multisig_descriptor_checks() {
        let k = TestKeychain::new();
        let mut f = flow(&k);

        let mut i = TxInput::new(&[44 | HARDENED, HARDENED, HARDENED, 0, 0], [0xaa; 32], 0, 100);
        i.multisig = Some(Multisig { m: 2, n: 3 });
        assert!(f.add_input(&i).is_ok());

        i.multisig = Some(Multisig { m: 4, n: 3 });
        assert_eq!(
            f.add_input(&i),
            Err(Error::Multisig("Invalid multisig parameters"))
        );
    }

    #[test]
    fn change_path_detection() {
        let k = TestKeychain::new();
        let f = flow(&k);

        // purpose' / coin' / account' / change / index
        assert!(f.is_change_path(&[44 | HARDENED, HARDENED, HARDENED, 1, 3]));
        assert!(!f.is_change_path(&[44 | HARDENED, HARDENED, HARDENED, 0, 3]));
        // wrong coin type
        assert!(!f.is_change_path(&[44 | HARDENED, 2 | HARDENED, HARDENED, 1, 3]));
        // wrong depth
        assert!(!f.is_change_path(&[44 | HARDENED, HARDENED, 1]));
    }

    #[test]
    fn overspend_detected_at_seal() {
        let k = TestKeychain::new();
        let mut f = flow(&k);

        let i = TxInput::new(&[44 | HARDENED, HARDENED, HARDENED, 0, 0], [0xaa; 32], 0, 100);
        f.add_input(&i).unwrap();

        let o = TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 200);
        f.add_output(0, &o).unwrap();

        assert_eq!(
            f.seal(),
            Err(Error::Signing(
                crate::engine::FaultCode::NotEnoughFunds,
                "Not enough funds"
            ))
        );
    }
}
