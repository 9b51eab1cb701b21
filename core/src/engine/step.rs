// Copyright (c) 2023-2024 The Coldsign Developers

//! Protocol step and resume value sums exchanged between the session
//! orchestrator and its signer
//!
//! A signer suspends by yielding exactly one [`Step`] and may only be
//! resumed with the one [`Resume`] value answering it; the sums are
//! closed so every step kind is handled exhaustively at compile time.

use strum::Display;

use coldsign_proto::{DerivationPath, tx::{TxAck, TxRequest}, MAX_ADDRESS};

/// On-device confirmation checkpoints a signer may emit
///
/// Each variant requires a distinct confirmation flow; the resume value
/// for all of them is the user's accept / reject decision.
#[derive(Clone, PartialEq, Debug, Display)]
pub enum Confirm {
    /// Review one transaction output (amount and destination)
    Output {
        /// Output index within the transaction
        index: u32,
        /// Destination address
        address: heapless::String<MAX_ADDRESS>,
        /// Output value
        amount: u64,
    },

    /// Review total spend and fee
    Total {
        /// Amount leaving the wallet, fee included
        spending: u64,
        /// Transaction fee
        fee: u64,
    },

    /// Fee exceeds the coin's safety threshold
    FeeOverThreshold {
        /// Transaction fee
        fee: u64,
    },

    /// Transaction uses a non-default lock time
    NonDefaultLocktime {
        /// Requested lock time
        lock_time: u32,
    },

    /// An output path does not match the device's derivation scheme
    ForeignAddress {
        /// The mismatched path
        address_n: DerivationPath,
    },
}

/// Value produced each time a signer suspends
#[derive(Clone, PartialEq, Debug)]
pub enum Step {
    /// Request to be sent to the host; [`RequestKind::Finished`]
    /// marks session completion
    ///
    /// [`RequestKind::Finished`]: coldsign_proto::tx::RequestKind
    Request(TxRequest),

    /// On-device confirmation, never visible to the host
    Confirm(Confirm),
}

impl Step {
    /// Check whether this step terminates the session
    pub fn is_terminal(&self) -> bool {
        match self {
            Step::Request(r) => r.is_finished(),
            _ => false,
        }
    }
}

/// Value fed back into a suspended signer, answering the
/// previously yielded [`Step`]
#[derive(Clone, PartialEq, Debug)]
pub enum Resume {
    /// Host reply to a [`Step::Request`]
    Ack(TxAck),

    /// User decision for a [`Step::Confirm`]
    Confirmed(bool),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_steps() {
        assert!(Step::Request(TxRequest::finished(None)).is_terminal());
        assert!(!Step::Request(TxRequest::input(0)).is_terminal());
        assert!(!Step::Confirm(Confirm::FeeOverThreshold { fee: 1 }).is_terminal());
    }
}
