// Copyright (c) 2023-2024 The Coldsign Developers

//! Scripted host answering session requests from a transaction vector

use coldsign_core::engine::{Host, TransportFault};
use coldsign_proto::tx::{RequestKind, TxAck, TxRequest};

use crate::vectors::TxVector;

/// Host answering every request from a [`TxVector`], recording the
/// request sequence as it goes
pub struct ScriptedHost {
    vector: TxVector,

    /// Requests issued by the session, in order
    pub requests: Vec<TxRequest>,

    /// Fail the transport after this many calls, when set
    pub fail_after: Option<usize>,
}

impl ScriptedHost {
    /// Create a host for the given vector
    pub fn new(vector: TxVector) -> Self {
        Self {
            vector,
            requests: Vec::new(),
            fail_after: None,
        }
    }

    /// Fail the transport after `n` successful calls
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl Host for ScriptedHost {
    fn call(&mut self, req: &TxRequest) -> Result<TxAck, TransportFault> {
        if let Some(n) = self.fail_after {
            if self.requests.len() >= n {
                return Err(TransportFault);
            }
        }

        self.requests.push(req.clone());

        match req.kind {
            RequestKind::Input => self
                .vector
                .inputs
                .get(req.index as usize)
                .cloned()
                .map(TxAck::Input)
                .ok_or(TransportFault),
            RequestKind::Output => self
                .vector
                .outputs
                .get(req.index as usize)
                .cloned()
                .map(TxAck::Output)
                .ok_or(TransportFault),
            RequestKind::Meta => self.vector.meta.map(TxAck::Meta).ok_or(TransportFault),
            RequestKind::Finished => Err(TransportFault),
        }
    }
}
