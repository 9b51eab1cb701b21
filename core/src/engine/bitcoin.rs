// Copyright (c) 2023-2024 The Coldsign Developers

//! Canonical Bitcoin-protocol signer
//!
//! Drives the full signing exchange for native-protocol coins: stream and
//! confirm the transaction, then sign each input with the legacy two-pass
//! scheme, re-streaming the whole transaction per input and verifying it
//! against the collection-phase commitments.
//!
//! The same machine hosts the BIP-143 style single-pass scheme used by
//! the altcoin and version-negotiated signers, which sign each input
//! directly against commitments precomputed during collection.

use strum::Display;

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{SignedInput, TxAck, TxInput, TxRequest},
    DerivationPath,
};

use crate::coins::CoinInfo;

use super::{
    digest::TxDigest,
    flow::{OutputDisposition, TxFlow},
    Confirm, Error, FaultCode, Keychain, Resume, Step,
};

/// Base hash type, all signatures commit to the full transaction
pub(crate) const SIGHASH_ALL: u32 = 0x01;

/// Fork flag folded into the hash type by BIP-143 forks
pub(crate) const SIGHASH_FORKID: u32 = 0x40;

/// Signing digest scheme, fixed at construction (or after version
/// negotiation for overwintered coins)
#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) enum SigScheme {
    /// Legacy two-pass signing, the transaction is re-streamed per input
    Legacy,

    /// Single-pass per-input digests with the fork id in the hash type
    Bip143 { fork_id: u8 },

    /// Single-pass per-input digests tagged with the negotiated branch
    Overwintered {
        version_group_id: u32,
        branch_id: u32,
    },
}

/// Signing phases
#[derive(Copy, Clone, PartialEq, Debug, Display)]
enum Phase {
    Init,
    /// Awaiting input `n` of the collection stream
    AwaitInput(u32),
    /// Awaiting output `n` of the collection stream
    AwaitOutput(u32),
    /// Awaiting user review of output `n`
    ConfirmOutput(u32),
    /// Awaiting user review of a foreign output path
    ConfirmForeign(u32),
    ConfirmLocktime,
    ConfirmFee,
    ConfirmTotal,
    /// Legacy pass for `input`, awaiting re-streamed input `at`
    StreamInput { input: u32, at: u32 },
    /// Legacy pass for `input`, awaiting re-streamed output `at`
    StreamOutput { input: u32, at: u32 },
    /// Single-pass signing, awaiting input `n`
    SignInput(u32),
    Finished,
    Failed,
}

/// Canonical Bitcoin-protocol signer state machine
pub struct Bitcoin<'a, K: Keychain> {
    flow: TxFlow<'a, K>,
    scheme: SigScheme,
    phase: Phase,

    /// Re-stream verification digests (compared against the sealed
    /// collection commitments)
    h_check_in: TxDigest,
    h_check_out: TxDigest,

    /// Signing digest for the legacy pass in progress
    sig_digest: TxDigest,

    /// Path of the input being signed, captured during the legacy pass
    sign_path: DerivationPath,

    /// Single-pass commitments, built during collection
    h_prevouts: TxDigest,
    h_sequences: TxDigest,
    prevouts_hash: [u8; 32],
    sequences_hash: [u8; 32],
}

impl<'a, K: Keychain> Bitcoin<'a, K> {
    /// Create a signer for a native-protocol coin
    pub fn new(msg: &SignTx, coin: &'static CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        if msg.expiry != 0 {
            return Err(Error::data("Expiry not supported"));
        }

        Self::with_scheme(msg, coin, keychain, SigScheme::Legacy)
    }

    /// Create a signer with an explicit digest scheme, used by the
    /// altcoin and version-negotiated variants
    pub(crate) fn with_scheme(
        msg: &SignTx,
        coin: &'static CoinInfo,
        keychain: &'a K,
        scheme: SigScheme,
    ) -> Result<Self, Error> {
        let flow = TxFlow::new(msg, coin, keychain)?;

        Ok(Self {
            flow,
            scheme,
            phase: Phase::Init,
            h_check_in: TxDigest::commitment(),
            h_check_out: TxDigest::commitment(),
            sig_digest: TxDigest::commitment(),
            sign_path: DerivationPath::new(),
            h_prevouts: TxDigest::new(b"coldsign.prevouts"),
            h_sequences: TxDigest::new(b"coldsign.sequences"),
            prevouts_hash: [0u8; 32],
            sequences_hash: [0u8; 32],
        })
    }

    /// Advance the signer with the resume value answering its last step
    pub fn resume(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        let r = self.step(res);

        if let Err(_e) = &r {
            #[cfg(feature = "log")]
            log::warn!("signer failed in phase {:?}: {:?}", self.phase, _e);

            self.phase = Phase::Failed;
        }

        r
    }

    fn step(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        match (self.phase, res) {
            // Start the exchange by requesting the first input
            (Phase::Init, None) => {
                self.phase = Phase::AwaitInput(0);
                Ok(Step::Request(TxRequest::input(0)))
            }

            // Collect inputs
            (Phase::AwaitInput(n), Some(Resume::Ack(TxAck::Input(input)))) => {
                self.flow.add_input(&input)?;

                if self.scheme != SigScheme::Legacy {
                    self.h_prevouts.prevout(&input);
                    self.h_sequences.u32(input.sequence);
                }

                self.next_input(n)
            }

            // Collect outputs
            (Phase::AwaitOutput(n), Some(Resume::Ack(TxAck::Output(output)))) => {
                match self.flow.add_output(n, &output)? {
                    OutputDisposition::Change => self.next_output(n),
                    OutputDisposition::External(c) => {
                        self.phase = Phase::ConfirmOutput(n);
                        Ok(Step::Confirm(c))
                    }
                    OutputDisposition::Foreign(c) => {
                        self.phase = Phase::ConfirmForeign(n);
                        Ok(Step::Confirm(c))
                    }
                }
            }

            // Checkpoint acknowledgements
            (
                Phase::ConfirmOutput(n) | Phase::ConfirmForeign(n),
                Some(Resume::Confirmed(true)),
            ) => self.next_output(n),
            (Phase::ConfirmLocktime, Some(Resume::Confirmed(true))) => self.fee_checkpoint(),
            (Phase::ConfirmFee, Some(Resume::Confirmed(true))) => self.total_checkpoint(),
            (Phase::ConfirmTotal, Some(Resume::Confirmed(true))) => self.begin_signing(),

            // Any rejected checkpoint cancels the session
            (
                Phase::ConfirmOutput(_)
                | Phase::ConfirmForeign(_)
                | Phase::ConfirmLocktime
                | Phase::ConfirmFee
                | Phase::ConfirmTotal,
                Some(Resume::Confirmed(false)),
            ) => Err(Error::cancelled()),

            // Legacy pass, re-stream inputs into check and signing digests
            (Phase::StreamInput { input, at }, Some(Resume::Ack(TxAck::Input(txin)))) => {
                self.h_check_in.input(&txin);
                self.sig_digest.input_slot(&txin, at == input);

                if at == input {
                    self.sign_path = txin.address_n.clone();
                }

                if at + 1 < self.flow.inputs_count {
                    self.phase = Phase::StreamInput { input, at: at + 1 };
                    Ok(Step::Request(TxRequest::input(at + 1)))
                } else {
                    self.phase = Phase::StreamOutput { input, at: 0 };
                    Ok(Step::Request(TxRequest::output(0)))
                }
            }

            // Legacy pass, re-stream outputs, then sign the marked slot
            (Phase::StreamOutput { input, at }, Some(Resume::Ack(TxAck::Output(txout)))) => {
                self.h_check_out.output(&txout);
                self.sig_digest.output(&txout);

                if at + 1 < self.flow.outputs_count {
                    self.phase = Phase::StreamOutput { input, at: at + 1 };
                    Ok(Step::Request(TxRequest::output(at + 1)))
                } else {
                    self.finish_legacy_input(input)
                }
            }

            // Single pass, request each input once and sign it directly
            (Phase::SignInput(n), Some(Resume::Ack(TxAck::Input(txin)))) => {
                self.h_check_in.input(&txin);

                let digest = self.single_pass_digest(&txin);
                let sig = self.flow.sign_input(&txin.address_n, digest, n)?;

                if n + 1 < self.flow.inputs_count {
                    self.phase = Phase::SignInput(n + 1);
                    Ok(Step::Request(
                        TxRequest::input(n + 1).with_signature(n, sig.signature),
                    ))
                } else {
                    self.verify_inputs_unchanged()?;
                    self.phase = Phase::Finished;
                    Ok(Step::Request(TxRequest::finished(Some(sig))))
                }
            }

            // Host answered with the wrong payload kind
            (
                Phase::AwaitInput(_)
                | Phase::AwaitOutput(_)
                | Phase::StreamInput { .. }
                | Phase::StreamOutput { .. }
                | Phase::SignInput(_),
                Some(Resume::Ack(_)),
            ) => Err(Error::Signing(
                FaultCode::UnexpectedMessage,
                "Unexpected message",
            )),

            // Anything else violates the step / resume pairing
            _ => Err(Error::UnexpectedResume),
        }
    }

    fn next_input(&mut self, n: u32) -> Result<Step, Error> {
        if n + 1 < self.flow.inputs_count {
            self.phase = Phase::AwaitInput(n + 1);
            Ok(Step::Request(TxRequest::input(n + 1)))
        } else {
            self.phase = Phase::AwaitOutput(0);
            Ok(Step::Request(TxRequest::output(0)))
        }
    }

    fn next_output(&mut self, n: u32) -> Result<Step, Error> {
        if n + 1 < self.flow.outputs_count {
            self.phase = Phase::AwaitOutput(n + 1);
            Ok(Step::Request(TxRequest::output(n + 1)))
        } else {
            self.collection_complete()
        }
    }

    /// Seal the collection phase and run the checkpoint chain
    fn collection_complete(&mut self) -> Result<Step, Error> {
        self.flow.seal()?;

        if self.scheme != SigScheme::Legacy {
            self.prevouts_hash = self.h_prevouts.finalize_reset();
            self.sequences_hash = self.h_sequences.finalize_reset();
        }

        if self.flow.lock_time != 0 {
            self.phase = Phase::ConfirmLocktime;
            return Ok(Step::Confirm(Confirm::NonDefaultLocktime {
                lock_time: self.flow.lock_time,
            }));
        }

        self.fee_checkpoint()
    }

    fn fee_checkpoint(&mut self) -> Result<Step, Error> {
        if self.flow.fee_over_threshold() {
            self.phase = Phase::ConfirmFee;
            return Ok(Step::Confirm(Confirm::FeeOverThreshold {
                fee: self.flow.fee(),
            }));
        }

        self.total_checkpoint()
    }

    fn total_checkpoint(&mut self) -> Result<Step, Error> {
        self.phase = Phase::ConfirmTotal;
        Ok(Step::Confirm(Confirm::Total {
            spending: self.flow.spending(),
            fee: self.flow.fee(),
        }))
    }

    fn begin_signing(&mut self) -> Result<Step, Error> {
        match self.scheme {
            SigScheme::Legacy => self.begin_legacy_pass(0, None),
            _ => {
                self.phase = Phase::SignInput(0);
                Ok(Step::Request(TxRequest::input(0)))
            }
        }
    }

    /// Start the legacy re-stream pass for one input, attaching the
    /// previous input's signature to the opening request
    fn begin_legacy_pass(&mut self, input: u32, sig: Option<SignedInput>) -> Result<Step, Error> {
        self.sig_digest = self.legacy_preimage();
        self.h_check_in = TxDigest::commitment();
        self.h_check_out = TxDigest::commitment();
        self.sign_path = DerivationPath::new();
        self.phase = Phase::StreamInput { input, at: 0 };

        let mut req = TxRequest::input(0);
        if let Some(s) = sig {
            req = req.with_signature(s.input_index, s.signature);
        }

        Ok(Step::Request(req))
    }

    fn legacy_preimage(&self) -> TxDigest {
        let mut d = TxDigest::new(b"coldsign.sighash.legacy");
        d.u32(self.flow.version);
        d.u32(self.flow.inputs_count);
        d.u32(self.flow.outputs_count);
        d
    }

    /// Close a legacy pass: verify the re-streamed transaction against the
    /// confirmed commitments, then sign the marked slot
    fn finish_legacy_input(&mut self, input: u32) -> Result<Step, Error> {
        if self.h_check_in.finalize_reset() != *self.flow.inputs_hash()
            || self.h_check_out.finalize_reset() != *self.flow.outputs_hash()
        {
            return Err(Error::process("Transaction has changed during signing"));
        }

        let mut d = core::mem::replace(&mut self.sig_digest, TxDigest::commitment());
        d.u32(self.flow.lock_time);
        d.u32(self.hash_type());
        let digest = d.finalize();

        let sig = self.flow.sign_input(&self.sign_path, digest, input)?;

        if input + 1 < self.flow.inputs_count {
            self.begin_legacy_pass(input + 1, Some(sig))
        } else {
            self.phase = Phase::Finished;
            Ok(Step::Request(TxRequest::finished(Some(sig))))
        }
    }

    /// Per-input signing digest for the single-pass schemes
    fn single_pass_digest(&self, txin: &TxInput) -> [u8; 32] {
        let mut d = match self.scheme {
            SigScheme::Legacy => TxDigest::new(b"coldsign.sighash.legacy"),
            SigScheme::Bip143 { .. } => TxDigest::new(b"coldsign.sighash.bip143"),
            SigScheme::Overwintered { branch_id, .. } => {
                let mut d = TxDigest::new(b"coldsign.sighash.overwinter");
                d.u32(branch_id);
                d
            }
        };

        let mut version = self.flow.version;
        if let SigScheme::Overwintered { .. } = self.scheme {
            version |= 0x8000_0000;
        }
        d.u32(version);

        if let SigScheme::Overwintered {
            version_group_id, ..
        } = self.scheme
        {
            d.u32(version_group_id);
        }

        d.bytes(&self.prevouts_hash);
        d.bytes(&self.sequences_hash);
        d.bytes(self.flow.outputs_hash());

        d.prevout(txin);
        d.u64(txin.amount);
        d.u32(txin.sequence);

        d.u32(self.flow.lock_time);
        d.u32(self.flow.expiry);
        d.u32(self.hash_type());

        d.finalize()
    }

    /// Final single-pass check: the re-requested inputs must match the
    /// confirmed stream before the terminal step is produced
    fn verify_inputs_unchanged(&mut self) -> Result<(), Error> {
        if self.h_check_in.finalize_reset() != *self.flow.inputs_hash() {
            return Err(Error::process("Transaction has changed during signing"));
        }

        Ok(())
    }

    fn hash_type(&self) -> u32 {
        match self.scheme {
            SigScheme::Legacy | SigScheme::Overwintered { .. } => SIGHASH_ALL,
            SigScheme::Bip143 { fork_id } => {
                SIGHASH_ALL | SIGHASH_FORKID | ((fork_id as u32) << 8)
            }
        }
    }

    /// Fetch signing progress (n / 100)
    pub fn progress(&self) -> usize {
        let i = self.flow.inputs_count as usize;
        let o = self.flow.outputs_count as usize;

        let collect = i + o + 1;
        let sign = match self.scheme {
            SigScheme::Legacy => i * (i + o),
            _ => i,
        };
        let total = collect + sign;

        let at = match self.phase {
            Phase::Init => 0,
            Phase::AwaitInput(n) => n as usize,
            Phase::AwaitOutput(n) | Phase::ConfirmOutput(n) | Phase::ConfirmForeign(n) => {
                i + n as usize
            }
            Phase::ConfirmLocktime | Phase::ConfirmFee | Phase::ConfirmTotal => i + o,
            Phase::StreamInput { input, at } => collect + input as usize * (i + o) + at as usize,
            Phase::StreamOutput { input, at } => {
                collect + input as usize * (i + o) + i + at as usize
            }
            Phase::SignInput(n) => collect + n as usize,
            Phase::Finished | Phase::Failed => total,
        };

        at * 100 / total.max(1)
    }
}

#[cfg(test)]
mod test {
    use coldsign_proto::tx::{RequestKind, TxOutput};

    use crate::coins;
    use crate::engine::test::TestKeychain;

    use super::*;

    const HARDENED: u32 = 0x8000_0000;

    fn spend_path(index: u32) -> [u32; 5] {
        [44 | HARDENED, HARDENED, HARDENED, 0, index]
    }

    fn change_path(index: u32) -> [u32; 5] {
        [44 | HARDENED, HARDENED, HARDENED, 1, index]
    }

    /// Walk a one-input, two-output legacy signing session step by step
    #[test]
    fn legacy_walkthrough() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(None).unwrap();
        let msg = SignTx::new(None, 1, 2);

        let mut signer = Bitcoin::new(&msg, coin, &keychain).unwrap();

        let input = TxInput::new(&spend_path(0), [0x11; 32], 0, 100_000);
        let spend = TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 89_000);
        let change = TxOutput::to_path(&change_path(0), 10_000);

        // Collection
        let s = signer.resume(None).unwrap();
        assert_eq!(s, Step::Request(TxRequest::input(0)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Input(input.clone()))))
            .unwrap();
        assert_eq!(s, Step::Request(TxRequest::output(0)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Output(spend.clone()))))
            .unwrap();
        assert!(matches!(s, Step::Confirm(Confirm::Output { amount: 89_000, .. })));

        let s = signer.resume(Some(Resume::Confirmed(true))).unwrap();
        assert_eq!(s, Step::Request(TxRequest::output(1)));

        // Change needs no confirmation, the checkpoint chain follows
        let s = signer
            .resume(Some(Resume::Ack(TxAck::Output(change.clone()))))
            .unwrap();
        assert_eq!(
            s,
            Step::Confirm(Confirm::Total {
                spending: 90_000,
                fee: 1_000
            })
        );

        // Signing pass re-streams the transaction
        let s = signer.resume(Some(Resume::Confirmed(true))).unwrap();
        assert_eq!(s, Step::Request(TxRequest::input(0)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Input(input.clone()))))
            .unwrap();
        assert_eq!(s, Step::Request(TxRequest::output(0)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Output(spend.clone()))))
            .unwrap();
        assert_eq!(s, Step::Request(TxRequest::output(1)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Output(change.clone()))))
            .unwrap();

        // Terminal step carries the signature for the only input
        let req = match s {
            Step::Request(r) => r,
            _ => panic!("unexpected step: {s:?}"),
        };
        assert_eq!(req.kind, RequestKind::Finished);
        assert_eq!(req.signature.as_ref().map(|s| s.input_index), Some(0));

        assert_eq!(signer.progress(), 100);
    }

    /// A transaction mutated between passes is refused
    #[test]
    fn changed_transaction_detected() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(None).unwrap();
        let msg = SignTx::new(None, 1, 1);

        let mut signer = Bitcoin::new(&msg, coin, &keychain).unwrap();

        let input = TxInput::new(&spend_path(0), [0x11; 32], 0, 100_000);
        let spend = TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 99_000);

        signer.resume(None).unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Input(input.clone()))))
            .unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Output(spend))))
            .unwrap();
        signer.resume(Some(Resume::Confirmed(true))).unwrap();
        signer.resume(Some(Resume::Confirmed(true))).unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Input(input))))
            .unwrap();

        // Re-streamed output differs from the confirmed one
        let mutated = TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 1_000);
        let r = signer.resume(Some(Resume::Ack(TxAck::Output(mutated))));

        assert_eq!(
            r,
            Err(Error::process("Transaction has changed during signing"))
        );

        // The machine is dead after a fault
        assert_eq!(
            signer.resume(Some(Resume::Confirmed(true))),
            Err(Error::UnexpectedResume)
        );
    }

    /// Expiry is not part of the native protocol
    #[test]
    fn expiry_rejected() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(None).unwrap();

        let mut msg = SignTx::new(None, 1, 1);
        msg.expiry = 100;

        assert!(Bitcoin::new(&msg, coin, &keychain).is_err());
    }
}
