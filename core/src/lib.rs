// Copyright (c) 2023-2024 The Coldsign Developers

//! Coldsign hardware wallet core
//!
//! This provides a common signing [Session][engine::Session] driving the
//! multi-round transaction signing protocol between a device and an
//! untrusted host, without key material ever leaving the device.
//!
//! Interactions are performed via [TxRequest][coldsign_proto::tx::TxRequest]s
//! issued by the device and [TxAck][coldsign_proto::tx::TxAck] replies from
//! the host, see [coldsign_proto] for message definitions and wire
//! encodings.
//!
//! ## Executing a transaction
//!
//! A session opens with a [`SignTx`][coldsign_proto::sign_tx::SignTx]
//! message carrying the transaction frame (coin name, counts, version,
//! lock time). The engine resolves the coin, selects the matching signer
//! implementation, then drives the exchange:
//!
//! 1. Each input is requested in turn and validated as it arrives.
//! 2. Each output is requested in turn; external outputs are confirmed on
//!    the device, change outputs are recognized by derivation path.
//! 3. Lock time, fee, and total-spend checkpoints are confirmed on the
//!    device as required.
//! 4. Inputs are signed, with signatures streaming back to the host
//!    inside the following request.
//! 5. The session closes with a [`RequestKind::Finished`][coldsign_proto::tx::RequestKind]
//!    request, or a [`Fault`][engine::Fault] if anything was rejected.
//!
//! The host never observes intermediate signing state: all transaction
//! construction state is private to the session's signer and discarded
//! when the session terminates.
//!
//! Platform integration happens through three traits: a
//! [`Keychain`][engine::Keychain] supplying signing keys, a
//! [`Host`][engine::Host] performing the transport round-trips, and an
//! [`Approver`][engine::Approver] rendering on-device confirmations.

#![cfg_attr(not(feature = "std"), no_std)]

pub use coldsign_proto as proto;

pub mod coins;

pub mod engine;

pub mod helpers;
