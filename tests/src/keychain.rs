// Copyright (c) 2023-2024 The Coldsign Developers

//! Deterministic keychain for test use

use sha2::{Digest as _, Sha256};
use zeroize::Zeroize;

use coldsign_core::engine::{KeyNode, Keychain};
use coldsign_proto::tx::Signature;

/// Keychain deriving key nodes from a fixed seed
pub struct MockKeychain {
    seed: [u8; 32],
}

impl MockKeychain {
    /// Create a keychain with the default test seed
    pub fn new() -> Self {
        Self::with_seed([0xc5; 32])
    }

    /// Create a keychain with an explicit seed
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self { seed }
    }
}

impl Default for MockKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl Keychain for MockKeychain {
    type Node = MockNode;

    fn derive(&self, path: &[u32]) -> MockNode {
        let mut h = Sha256::new();
        h.update(self.seed);
        for p in path {
            h.update(p.to_le_bytes());
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(&h.finalize());

        MockNode { secret }
    }
}

/// Key node binding the derived secret and the signed digest
pub struct MockNode {
    secret: [u8; 32],
}

impl Zeroize for MockNode {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

impl KeyNode for MockNode {
    fn sign(&self, digest: &[u8; 32]) -> Signature {
        let mut h = Sha256::new();
        h.update(self.secret);
        h.update(digest);

        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&h.finalize());
        sig[32..].copy_from_slice(digest);

        Signature(sig)
    }
}
