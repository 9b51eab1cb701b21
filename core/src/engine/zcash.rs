// Copyright (c) 2023-2024 The Coldsign Developers

//! Version-negotiated (Overwintered) signer
//!
//! Overwintered transactions commit to a consensus branch and version
//! group, neither of which is carried in the opening request; the signer
//! starts with a metadata round to negotiate them before the regular
//! exchange begins. Signing is single-pass with a branch-tagged digest.

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{TxAck, TxRequest},
};

use crate::coins::CoinInfo;

use super::{
    bitcoin::{Bitcoin, SigScheme},
    Error, FaultCode, Keychain, Resume, Step,
};

/// Version-negotiated signer for Overwintered transaction formats
pub struct Overwintered<'a, K: Keychain> {
    msg: SignTx,
    coin: &'static CoinInfo,
    keychain: &'a K,

    /// Negotiation issued, awaiting metadata
    negotiating: bool,

    /// Negotiation faulted, no further calls accepted
    failed: bool,

    /// Inner machine, constructed once negotiation completes
    inner: Option<Bitcoin<'a, K>>,
}

impl<'a, K: Keychain> Overwintered<'a, K> {
    /// Create a signer for an Overwintered coin
    pub fn new(msg: &SignTx, coin: &'static CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        if msg.version < 3 || msg.version > 4 {
            return Err(Error::data("Unsupported transaction version"));
        }

        Ok(Self {
            msg: msg.clone(),
            coin,
            keychain,
            negotiating: false,
            failed: false,
            inner: None,
        })
    }

    /// Advance the signer with the resume value answering its last step
    pub fn resume(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        if let Some(inner) = self.inner.as_mut() {
            return inner.resume(res);
        }

        let r = self.negotiate(res);

        if r.is_err() {
            self.failed = true;
        }

        r
    }

    fn negotiate(&mut self, res: Option<Resume>) -> Result<Step, Error> {
        if self.failed {
            return Err(Error::UnexpectedResume);
        }

        match (self.negotiating, res) {
            // Open with the negotiation round
            (false, None) => {
                self.negotiating = true;
                Ok(Step::Request(TxRequest::meta()))
            }

            // Validate negotiated parameters and start the exchange
            (true, Some(Resume::Ack(TxAck::Meta(meta)))) => {
                if meta.version_group_id == 0 {
                    return Err(Error::data("Version group ID must be set"));
                }
                if meta.branch_id == 0 {
                    return Err(Error::data("Branch ID must be set"));
                }

                let mut msg = self.msg.clone();
                msg.expiry = meta.expiry;

                let mut inner = Bitcoin::with_scheme(
                    &msg,
                    self.coin,
                    self.keychain,
                    SigScheme::Overwintered {
                        version_group_id: meta.version_group_id,
                        branch_id: meta.branch_id,
                    },
                )?;

                let step = inner.resume(None)?;
                self.inner = Some(inner);

                Ok(step)
            }

            (true, Some(Resume::Ack(_))) => Err(Error::Signing(
                FaultCode::UnexpectedMessage,
                "Unexpected message",
            )),

            _ => Err(Error::UnexpectedResume),
        }
    }

    /// Fetch signing progress (n / 100)
    pub fn progress(&self) -> usize {
        self.inner.as_ref().map(|i| i.progress()).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use coldsign_proto::tx::{RequestKind, TxMeta};

    use crate::coins;
    use crate::engine::test::TestKeychain;

    use super::*;

    fn msg() -> SignTx {
        let mut m = SignTx::new(Some("Zcash"), 1, 1);
        m.version = 4;
        m
    }

    /// The first step is always the metadata negotiation round
    #[test]
    fn negotiates_before_exchange() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(Some("Zcash")).unwrap();

        let mut signer = Overwintered::new(&msg(), coin, &keychain).unwrap();

        let s = signer.resume(None).unwrap();
        assert_eq!(s, Step::Request(TxRequest::meta()));

        let s = signer
            .resume(Some(Resume::Ack(TxAck::Meta(TxMeta {
                version_group_id: 0x892f2085,
                branch_id: 0x76b809bb,
                expiry: 0,
            }))))
            .unwrap();

        assert!(matches!(
            s,
            Step::Request(ref r) if r.kind == RequestKind::Input && r.index == 0
        ));
    }

    #[test]
    fn missing_version_group_rejected() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(Some("Zcash")).unwrap();

        let mut signer = Overwintered::new(&msg(), coin, &keychain).unwrap();
        signer.resume(None).unwrap();

        let r = signer.resume(Some(Resume::Ack(TxAck::Meta(TxMeta {
            version_group_id: 0,
            branch_id: 0x76b809bb,
            expiry: 0,
        }))));

        assert_eq!(r, Err(Error::data("Version group ID must be set")));
    }

    #[test]
    fn unsupported_version_rejected() {
        let keychain = TestKeychain::new();
        let coin = coins::by_name(Some("Zcash")).unwrap();

        let mut m = msg();
        m.version = 1;

        assert_eq!(
            Overwintered::new(&m, coin, &keychain).err(),
            Some(Error::data("Unsupported transaction version"))
        );
    }
}
