// Copyright (c) 2023-2024 The Coldsign Developers

//! Decred signer
//!
//! Decred commits every signature to a prefix hash covering the full
//! transaction, built while the inputs and outputs stream in, so no
//! re-stream of the whole transaction is needed per input: after the
//! checkpoints a single witness pass revisits each input and signs
//! `(hash_type, prefix, input)` directly. Script versions other than
//! zero are not supported.

use strum::Display;

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{TxAck, TxInput, TxRequest},
};

use crate::coins::CoinInfo;

use super::{
    bitcoin::SIGHASH_ALL,
    digest::TxDigest,
    flow::{OutputDisposition, TxFlow},
    Confirm, Error, FaultCode, Keychain, Resume, Step,
};

/// Signing phases
#[derive(Copy, Clone, PartialEq, Debug, Display)]
enum Phase {
    Init,
    AwaitInput(u32),
    AwaitOutput(u32),
    ConfirmOutput(u32),
    ConfirmForeign(u32),
    ConfirmLocktime,
    ConfirmFee,
    ConfirmTotal,
    /// Witness pass, awaiting input `n`
    Witness(u32),
    Finished,
    Failed,
}

/// Decred signer state machine
pub struct Decred<'a, K: Keychain> {
    flow: TxFlow<'a, K>,
    phase: Phase,

    /// Prefix commitment over the whole transaction, sealed after
    /// collection
    h_prefix: TxDigest,
    prefix_hash: [u8; 32],

    /// Witness-pass verification digest
    h_check: TxDigest,
}

impl<'a, K: Keychain> Decred<'a, K> {
    /// Create a Decred signer
    pub fn new(msg: &SignTx, coin: &'static CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        let flow = TxFlow::new(msg, coin, keychain)?;

        let mut h_prefix = TxDigest::new(b"coldsign.decred.prefix");
        h_prefix.u32(msg.version);

        Ok(Self {
            flow,
            phase: Phase::Init,
            h_prefix,
            prefix_hash: [0u8; 32],
            h_check: TxDigest::commitment(),
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
            (Phase::Init, None) => {
                self.phase = Phase::AwaitInput(0);
                Ok(Step::Request(TxRequest::input(0)))
            }

            // Collect inputs into the totals and the prefix commitment
            (Phase::AwaitInput(n), Some(Resume::Ack(TxAck::Input(input)))) => {
                check_script_version(&input)?;
                self.flow.add_input(&input)?;

                self.h_prefix.prevout(&input);
                self.h_prefix.u32(input.sequence);

                if n + 1 < self.flow.inputs_count {
                    self.phase = Phase::AwaitInput(n + 1);
                    Ok(Step::Request(TxRequest::input(n + 1)))
                } else {
                    self.phase = Phase::AwaitOutput(0);
                    Ok(Step::Request(TxRequest::output(0)))
                }
            }

            // Collect outputs
            (Phase::AwaitOutput(n), Some(Resume::Ack(TxAck::Output(output)))) => {
                let disposition = self.flow.add_output(n, &output)?;

                self.h_prefix.output(&output);

                match disposition {
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
            (Phase::ConfirmTotal, Some(Resume::Confirmed(true))) => {
                self.phase = Phase::Witness(0);
                Ok(Step::Request(TxRequest::input(0)))
            }

            (
                Phase::ConfirmOutput(_)
                | Phase::ConfirmForeign(_)
                | Phase::ConfirmLocktime
                | Phase::ConfirmFee
                | Phase::ConfirmTotal,
                Some(Resume::Confirmed(false)),
            ) => Err(Error::cancelled()),

            // Witness pass: each input is revisited once and signed
            // against the sealed prefix
            (Phase::Witness(n), Some(Resume::Ack(TxAck::Input(txin)))) => {
                check_script_version(&txin)?;
                self.h_check.input(&txin);

                let digest = self.witness_digest(&txin);
                let sig = self.flow.sign_input(&txin.address_n, digest, n)?;

                if n + 1 < self.flow.inputs_count {
                    self.phase = Phase::Witness(n + 1);
                    Ok(Step::Request(
                        TxRequest::input(n + 1).with_signature(n, sig.signature),
                    ))
                } else {
                    if self.h_check.finalize_reset() != *self.flow.inputs_hash() {
                        return Err(Error::process("Transaction has changed during signing"));
                    }

                    self.phase = Phase::Finished;
                    Ok(Step::Request(TxRequest::finished(Some(sig))))
                }
            }

            // Host answered with the wrong payload kind
            (
                Phase::AwaitInput(_) | Phase::AwaitOutput(_) | Phase::Witness(_),
                Some(Resume::Ack(_)),
            ) => Err(Error::Signing(
                FaultCode::UnexpectedMessage,
                "Unexpected message",
            )),

            _ => Err(Error::UnexpectedResume),
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

    /// Seal the collection phase and the prefix commitment, then run
    /// the checkpoint chain
    fn collection_complete(&mut self) -> Result<Step, Error> {
        self.flow.seal()?;

        self.h_prefix.u32(self.flow.lock_time);
        self.h_prefix.u32(self.flow.expiry);
        self.prefix_hash = self.h_prefix.finalize_reset();

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

    /// Per-input witness digest: hash type, prefix commitment, and the
    /// input being signed
    fn witness_digest(&self, txin: &TxInput) -> [u8; 32] {
        let mut d = TxDigest::new(b"coldsign.decred.witness");

        d.u32(SIGHASH_ALL);
        d.bytes(&self.prefix_hash);
        d.prevout(txin);
        d.u64(txin.amount);

        d.finalize()
    }

    /// Fetch signing progress (n / 100)
    pub fn progress(&self) -> usize {
        let i = self.flow.inputs_count as usize;
        let o = self.flow.outputs_count as usize;

        let total = i + o + 1 + i;

        let at = match self.phase {
            Phase::Init => 0,
            Phase::AwaitInput(n) => n as usize,
            Phase::AwaitOutput(n) | Phase::ConfirmOutput(n) | Phase::ConfirmForeign(n) => {
                i + n as usize
            }
            Phase::ConfirmLocktime | Phase::ConfirmFee | Phase::ConfirmTotal => i + o,
            Phase::Witness(n) => i + o + 1 + n as usize,
            Phase::Finished | Phase::Failed => total,
        };

        at * 100 / total.max(1)
    }
}

/// Only script version zero is signable
fn check_script_version(input: &TxInput) -> Result<(), Error> {
    match input.script_version {
        0 => Ok(()),
        _ => Err(Error::Script("Unsupported script version")),
    }
}

#[cfg(test)]
mod test {
    use coldsign_proto::tx::{RequestKind, TxOutput};

    use crate::coins;
    use crate::engine::test::TestKeychain;

    use super::*;

    const HARDENED: u32 = 0x8000_0000;

    fn input(index: u32, amount: u64) -> TxInput {
        TxInput::new(
            &[44 | HARDENED, 42 | HARDENED, HARDENED, 0, index],
            [0x44; 32],
            index,
            amount,
        )
    }

    /// Two inputs sign in a single witness pass against the shared prefix
    #[test]
    fn witness_pass() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(Some("Decred")).unwrap();
        let msg = SignTx::new(Some("Decred"), 2, 1);

        let mut signer = Decred::new(&msg, coin, &keychain).unwrap();

        let spend = TxOutput::to_address("DsQxuVRvS4eaJ42dhQEsCXauMWjvopWgrVg", 195_000);

        signer.resume(None).unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Input(input(0, 100_000)))))
            .unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Input(input(1, 100_000)))))
            .unwrap();
        signer
            .resume(Some(Resume::Ack(TxAck::Output(spend))))
            .unwrap();
        signer.resume(Some(Resume::Confirmed(true))).unwrap();
        let s = signer.resume(Some(Resume::Confirmed(true))).unwrap();
        assert_eq!(s, Step::Request(TxRequest::input(0)));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Input(input(0, 100_000)))))
            .unwrap();
        let req = match s {
            Step::Request(r) => r,
            _ => panic!("unexpected step: {s:?}"),
        };
        assert_eq!(req.kind, RequestKind::Input);
        assert_eq!(req.index, 1);
        assert_eq!(req.signature.as_ref().map(|s| s.input_index), Some(0));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Input(input(1, 100_000)))))
            .unwrap();
        let req = match s {
            Step::Request(r) => r,
            _ => panic!("unexpected step: {s:?}"),
        };
        assert_eq!(req.kind, RequestKind::Finished);
        assert_eq!(req.signature.as_ref().map(|s| s.input_index), Some(1));
    }

    /// Nonzero script versions are refused during collection
    #[test]
    fn script_version_rejected() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(Some("Decred")).unwrap();
        let msg = SignTx::new(Some("Decred"), 1, 1);

        let mut signer = Decred::new(&msg, coin, &keychain).unwrap();
        signer.resume(None).unwrap();

        let mut i = input(0, 100_000);
        i.script_version = 1;

        assert_eq!(
            signer.resume(Some(Resume::Ack(TxAck::Input(i)))),
            Err(Error::Script("Unsupported script version"))
        );
    }
}
