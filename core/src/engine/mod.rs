// Copyright (c) 2023-2024 The Coldsign Developers

//! The signing [Session] drives the multi-round transaction protocol.
//!
//! A session owns exactly one [Signer] selected for the requested coin
//! and loops it to completion: every time the signer suspends with a
//! [Step] the session either performs the host round-trip or runs the
//! matching on-device confirmation, then resumes the signer with the
//! answering [Resume] value. Internal errors are collapsed into a single
//! wire-visible [Fault] at this boundary.

use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::Zeroize;

use coldsign_proto::{
    sign_tx::SignTx,
    tx::{Signature, TxAck, TxRequest},
};

use crate::coins;

mod error;
pub use error::{Error, Fault, FaultCode};

mod step;
pub use step::{Confirm, Resume, Step};

mod signer;
pub use signer::Signer;

mod bitcoin;
pub use bitcoin::Bitcoin;

#[cfg(feature = "altcoin")]
mod bitcoinlike;
#[cfg(feature = "altcoin")]
pub use bitcoinlike::Bitcoinlike;

#[cfg(feature = "altcoin")]
mod decred;
#[cfg(feature = "altcoin")]
pub use decred::Decred;

#[cfg(feature = "altcoin")]
mod zcash;
#[cfg(feature = "altcoin")]
pub use zcash::Overwintered;

mod digest;

mod flow;

/// [`Keychain`] supplies signing keys to the session
///
/// Key sourcing is assumed infallible; anything the backend raises
/// passes through the error taxonomy unchanged.
pub trait Keychain {
    /// Derived key node type
    type Node: KeyNode;

    /// Derive the key node for a path
    fn derive(&self, path: &[u32]) -> Self::Node;
}

impl<T: Keychain> Keychain for &T {
    type Node = T::Node;

    fn derive(&self, path: &[u32]) -> Self::Node {
        T::derive(self, path)
    }
}

/// Signing key node, wiped immediately after use
pub trait KeyNode: Zeroize {
    /// Sign a 32-byte digest
    fn sign(&self, digest: &[u8; 32]) -> Signature;
}

/// Transport failure, aborting the session
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TransportFault;

/// [`Host`] performs one request / reply round-trip over the transport,
/// blocking until the reply arrives
pub trait Host {
    /// Send a request and await the host's acknowledgement
    fn call(&mut self, req: &TxRequest) -> Result<TxAck, TransportFault>;
}

/// [`Approver`] renders on-device confirmations
///
/// The session brackets every confirmation in `acquire` / `release` so
/// presentation resources never persist across a suspension; `release`
/// runs unconditionally, including when rendering panics.
pub trait Approver {
    /// Bring up the confirmation surface
    fn acquire(&mut self);

    /// Render a confirmation and block for the user's decision
    fn render(&mut self, req: &Confirm) -> bool;

    /// Tear the confirmation surface back down
    fn release(&mut self);
}

/// Releases the approver surface when dropped
struct Surface<'a, U: Approver + ?Sized>(&'a mut U);

impl<'a, U: Approver + ?Sized> Drop for Surface<'a, U> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Run one confirmation flow under the scoped-acquisition discipline
fn present<U: Approver>(ui: &mut U, req: &Confirm) -> bool {
    ui.acquire();

    let mut surface = Surface(ui);
    surface.0.render(req)
}

/// Session state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Session running, signer calls permitted
    Active,
    /// Terminal request produced, session result available
    Complete,
    /// Fault surfaced, session discarded
    Failed,
}

/// One transaction signing session
///
/// Created per request and discarded on termination; the signer and all
/// transaction construction state are private to the session.
pub struct Session<'a, K: Keychain> {
    state: State,
    signer: Signer<'a, K>,
}

impl<'a, K: Keychain> Session<'a, K> {
    /// Dispatch a signing request: resolve nothing here beyond signer
    /// selection, any construction failure raises through the taxonomy
    pub fn new(msg: &SignTx, coin: &'static crate::coins::CoinInfo, keychain: &'a K) -> Result<Self, Error> {
        let signer = Signer::for_coin(msg, coin, keychain)?;

        #[cfg(feature = "log")]
        log::debug!("session start: {} signer for {}", signer.name(), coin.name);

        Ok(Self {
            state: State::Active,
            signer,
        })
    }

    /// Fetch current session state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch the selected signer variant name
    pub fn signer_name(&self) -> &'static str {
        self.signer.name()
    }

    /// Fetch progress for an active session
    pub fn progress(&self) -> Option<usize> {
        match self.state {
            State::Active => Some(self.signer.progress()),
            _ => None,
        }
    }

    /// Perform one signer call, enforcing terminal exclusivity and
    /// collapsing raised errors into the wire fault shape
    pub fn advance(&mut self, res: Option<Resume>) -> Result<Step, Fault> {
        if self.state != State::Active {
            return Err(Fault::TERMINAL);
        }

        match self.signer.resume(res) {
            Ok(step) => {
                if step.is_terminal() {
                    self.state = State::Complete;
                }

                Ok(step)
            }
            Err(e) => {
                #[cfg(feature = "log")]
                log::warn!("session fault: {:?}", e);

                self.state = State::Failed;
                Err(Fault::from(e))
            }
        }
    }

    /// Drive the session to termination, returning the terminal request
    ///
    /// Each round resolves the signer's outstanding step fully - a host
    /// round-trip or an on-device confirmation - before the next signer
    /// call; at most one step is ever outstanding.
    pub fn run<H: Host, U: Approver>(mut self, host: &mut H, ui: &mut U) -> Result<TxRequest, Fault> {
        let mut res = None;

        loop {
            let step = self.advance(res.take())?;

            match step {
                Step::Request(req) if req.is_finished() => {
                    #[cfg(feature = "log")]
                    log::debug!("session complete");

                    return Ok(req);
                }
                Step::Request(req) => {
                    let ack = match host.call(&req) {
                        Ok(v) => v,
                        Err(_) => return Err(Fault::TRANSPORT),
                    };

                    res = Some(Resume::Ack(ack));
                }
                Step::Confirm(c) => {
                    let approved = present(ui, &c);

                    res = Some(Resume::Confirmed(approved));
                }
            }
        }
    }
}

/// Sign a transaction: resolve the coin, dispatch a session, and run it
/// to termination
///
/// This is the transport-facing entry point; every internal failure
/// surfaces as a single [Fault].
pub fn sign_tx<K, H, U>(
    msg: &SignTx,
    keychain: &K,
    host: &mut H,
    ui: &mut U,
) -> Result<TxRequest, Fault>
where
    K: Keychain,
    H: Host,
    U: Approver,
{
    let coin = coins::by_name(msg.coin_name()).map_err(Fault::from)?;

    let session = Session::new(msg, coin, keychain)?;

    session.run(host, ui)
}
