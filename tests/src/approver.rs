// Copyright (c) 2023-2024 The Coldsign Developers

//! Recording approver for confirmation flows

use coldsign_core::engine::{Approver, Confirm};

/// Approver recording every confirmation and the surface lifecycle,
/// with a configurable rejection rule
pub struct RecordingApprover {
    /// Confirmations presented, in order
    pub confirms: Vec<Confirm>,

    /// Surface acquire / release counts
    pub acquires: usize,
    pub releases: usize,

    /// Rejection rule; a confirmation matching it is denied
    deny: Option<fn(&Confirm) -> bool>,
}

impl RecordingApprover {
    /// Approver accepting every confirmation
    pub fn allow_all() -> Self {
        Self {
            confirms: Vec::new(),
            acquires: 0,
            releases: 0,
            deny: None,
        }
    }

    /// Approver denying confirmations matching the rule
    pub fn deny_when(deny: fn(&Confirm) -> bool) -> Self {
        Self {
            deny: Some(deny),
            ..Self::allow_all()
        }
    }

    /// Check the surface was released exactly as often as acquired
    pub fn surface_balanced(&self) -> bool {
        self.acquires == self.releases
    }
}

impl Approver for RecordingApprover {
    fn acquire(&mut self) {
        // A second acquisition before release means presentation
        // state leaked across a suspension
        assert_eq!(
            self.acquires, self.releases,
            "confirmation surface acquired while already held"
        );

        self.acquires += 1;
    }

    fn render(&mut self, req: &Confirm) -> bool {
        self.confirms.push(req.clone());

        match self.deny {
            Some(deny) => !deny(req),
            None => true,
        }
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}
