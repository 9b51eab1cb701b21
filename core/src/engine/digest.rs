// Copyright (c) 2023-2024 The Coldsign Developers

//! Running transaction digests
//!
//! One digest type serves two purposes: the session commitments used to
//! detect a transaction changing between streaming passes, and the
//! per-input signing digests handed to the key backend. Field-level
//! serialization is canonical little-endian; script templates are applied
//! downstream by the serializer, which commits to the same fields.

use sha2::{Digest as _, Sha256};

use coldsign_proto::tx::{TxInput, TxOutput};

/// Streaming transaction digest with domain separation
#[derive(Clone)]
pub(crate) struct TxDigest {
    h: Sha256,
}

impl TxDigest {
    /// Create a new digest under the given domain tag
    pub fn new(personal: &[u8]) -> Self {
        let mut h = Sha256::new();
        h.update([personal.len() as u8]);
        h.update(personal);

        Self { h }
    }

    /// Create a commitment digest for stream-verification use
    pub fn commitment() -> Self {
        Self::new(b"coldsign.tx.v1")
    }

    /// Update with raw bytes
    pub fn bytes(&mut self, d: &[u8]) {
        self.h.update(d);
    }

    /// Update with a little-endian u32
    pub fn u32(&mut self, v: u32) {
        self.h.update(v.to_le_bytes());
    }

    /// Update with a little-endian u64
    pub fn u64(&mut self, v: u64) {
        self.h.update(v.to_le_bytes());
    }

    /// Commit to an input's previous-output reference
    pub fn prevout(&mut self, i: &TxInput) {
        self.bytes(&i.prev_hash);
        self.u32(i.prev_index);
    }

    /// Commit to all fields of an input
    pub fn input(&mut self, i: &TxInput) {
        self.prevout(i);
        self.u32(i.sequence);
        self.u64(i.amount);
        self.bytes(&[i.script_version]);

        match &i.multisig {
            Some(m) => self.bytes(&[1, m.m, m.n]),
            None => self.bytes(&[0]),
        }

        self.path(&i.address_n);
    }

    /// Commit to an input occupying a script slot of a legacy signing
    /// digest, marking whether this is the slot being signed
    pub fn input_slot(&mut self, i: &TxInput, signing: bool) {
        self.prevout(i);
        self.bytes(&[signing as u8]);
        self.u32(i.sequence);
    }

    /// Commit to all fields of an output
    pub fn output(&mut self, o: &TxOutput) {
        self.u64(o.amount);
        self.bytes(&[o.script_type as u8]);
        self.bytes(&[o.address.len() as u8]);
        self.bytes(o.address.as_bytes());
        self.path(&o.address_n);
    }

    /// Commit to a derivation path
    fn path(&mut self, p: &[u32]) {
        self.bytes(&[p.len() as u8]);
        for v in p {
            self.u32(*v);
        }
    }

    /// Finalize the digest (double SHA-256)
    pub fn finalize(self) -> [u8; 32] {
        let first = self.h.finalize();

        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(first));
        out
    }

    /// Finalize the digest (double SHA-256) and reset to the
    /// post-construction state
    pub fn finalize_reset(&mut self) -> [u8; 32] {
        let first = self.h.finalize_reset();

        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(first));
        out
    }
}
