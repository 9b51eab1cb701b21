// Copyright (c) 2023-2024 The Coldsign Developers

//! Protocol message definitions for coldsign hardware wallet communication
//!
//! This crate provides the message layer exchanged between a signing device
//! and its host during a transaction signing session: the initiating
//! [`SignTx`][sign_tx::SignTx] message, the device-to-host
//! [`TxRequest`][tx::TxRequest], and the host-to-device
//! [`TxAck`][tx::TxAck] payloads.
//!
//! Messages use a primitive binary encoding to simplify implementation on
//! constrained platforms and in other languages. Encodings are intended to
//! be _roughly_ equivalent to packed c structures while maintaining 32-bit
//! field alignment where variable-length tails allow it. All field
//! encodings are little-endian.

#![no_std]

use core::fmt::Debug;

pub mod prelude;
pub mod sign_tx;
pub mod tx;

mod helpers;

/// Signing protocol version
pub const SIGN_PROTO_VERSION: u8 = 0x01;

/// Maximum derivation path depth
pub const MAX_PATH: usize = 8;

/// Maximum encoded address length (longest expected bech32 form)
pub const MAX_ADDRESS: usize = 90;

/// Maximum coin name length
pub const MAX_COIN_NAME: usize = 20;

/// Derivation path type, bounded at [`MAX_PATH`] elements
pub type DerivationPath = heapless::Vec<u32, MAX_PATH>;

static_assertions::const_assert!(MAX_ADDRESS <= u8::MAX as usize);
static_assertions::const_assert!(MAX_COIN_NAME <= u8::MAX as usize);
static_assertions::const_assert!(MAX_PATH * 4 <= u8::MAX as usize);

/// Wire encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum WireError {
    /// Buffer too short for the encoded object
    InvalidLength,

    /// Field contents failed to decode
    InvalidEncoding,

    /// Unrecognised message or request kind
    UnknownKind,
}

impl From<encdec::Error> for WireError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => WireError::InvalidLength,
            _ => WireError::InvalidEncoding,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use encdec::{DecodeOwned, Encode};

    /// Helper for message encode / decode tests
    pub fn encode_decode_msg<M>(buff: &mut [u8], msg: &M) -> usize
    where
        M: Encode<Error = super::WireError>
            + DecodeOwned<Output = M, Error = super::WireError>
            + PartialEq
            + core::fmt::Debug,
    {
        // Encode message
        let n = msg.encode(buff).expect("encode failed");

        // Check encoded length matches expected length
        let expected_n = msg.encode_len().expect("get length failed");
        assert_eq!(n, expected_n, "encode length mismatch");

        // Decode message
        let (decoded, decoded_n) = M::decode_owned(&buff[..n]).expect("decode failed");

        // Check decoded object and length match
        assert_eq!(msg, &decoded);
        assert_eq!(expected_n, decoded_n);

        // Return length, useful for rough confirmation of packing expectations
        n
    }
}
