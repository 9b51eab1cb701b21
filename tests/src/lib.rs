// Copyright (c) 2023-2024 The Coldsign Developers

//! Test harness for coldsign signing sessions
//!
//! Provides a scripted host, a recording approver, a deterministic
//! keychain and a set of transaction vectors, for reuse across the
//! engine's integration tests.

use coldsign_core::engine::{self, Confirm, Fault};
use coldsign_proto::tx::TxRequest;

pub mod approver;
pub use approver::RecordingApprover;

pub mod host;
pub use host::ScriptedHost;

pub mod keychain;
pub use keychain::MockKeychain;

pub mod vectors;
pub use vectors::TxVector;

/// Everything observed while driving one session
pub struct Outcome {
    /// Session result: the terminal request or the surfaced fault
    pub result: Result<TxRequest, Fault>,

    /// Requests issued over the (mock) transport, in order
    pub requests: Vec<TxRequest>,

    /// Confirmations presented on the (mock) device, in order
    pub confirms: Vec<Confirm>,

    /// Confirmation surface acquire / release counts
    pub acquires: usize,
    pub releases: usize,
}

/// Drive a vector through a full session, approving every confirmation
pub fn drive(vector: &TxVector) -> Outcome {
    drive_with(vector, RecordingApprover::allow_all())
}

/// Drive a vector through a full session with the provided approver
pub fn drive_with(vector: &TxVector, mut ui: RecordingApprover) -> Outcome {
    let keychain = MockKeychain::new();
    let mut host = ScriptedHost::new(vector.clone());

    let result = engine::sign_tx(&vector.sign_tx(), &keychain, &mut host, &mut ui);

    Outcome {
        result,
        requests: host.requests,
        confirms: ui.confirms,
        acquires: ui.acquires,
        releases: ui.releases,
    }
}

/// Initialise test logging (idempotent)
pub fn init_logging() {
    let _ = simplelog::TermLogger::init(
        log::LevelFilter::Debug,
        Default::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
}
