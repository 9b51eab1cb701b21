// Copyright (c) 2023-2024 The Coldsign Developers

//! Transaction round-trip messages, exchanged for every step of a
//! signing session.
//!
//! The device drives the session: each round it emits a [`TxRequest`]
//! naming the piece of the transaction it wants next (or the terminal
//! [`RequestKind::Finished`]), and the host answers with a matching
//! [`TxAck`] payload. Signatures stream back to the host inside the
//! request that follows their production.
//!
//! See `coldsign-core` for the state machines consuming these.

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::{helpers::le, WireError};

mod ack;
pub use ack::*;

/// Request kinds issued by the device during a signing session
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum RequestKind {
    /// Transaction input wanted, see [`TxRequest::index`]
    Input = 0x00,
    /// Transaction output wanted, see [`TxRequest::index`]
    Output = 0x01,
    /// Transaction metadata wanted (version-negotiated coins)
    Meta = 0x02,
    /// Terminal kind, the signing session is complete
    Finished = 0x03,
}

impl Encode for RequestKind {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.is_empty() {
            return Err(WireError::InvalidLength);
        }

        buff[0] = *self as u8;
        Ok(1)
    }
}

impl DecodeOwned for RequestKind {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(<Self as DecodeOwned>::Output, usize), WireError> {
        if buff.is_empty() {
            return Err(WireError::InvalidLength);
        }

        match Self::try_from(buff[0]) {
            Ok(v) => Ok((v, 1)),
            Err(_) => Err(WireError::UnknownKind),
        }
    }
}

/// Opaque signature value produced by the key backend
#[derive(Copy, Clone, PartialEq)]
pub struct Signature(pub [u8; 64]);

/// Debug format [Signature] as hex
impl core::fmt::Debug for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl Encode for Signature {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        Ok(64)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        crate::helpers::arr::enc(&self.0, buff)
    }
}

impl DecodeOwned for Signature {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        let (d, n) = crate::helpers::arr::dec(buff)?;
        Ok((Self(d), n))
    }
}

/// Signature for a completed input, streamed inside the following request
#[derive(Clone, PartialEq, Debug)]
pub struct SignedInput {
    /// Index of the input this signature covers
    pub input_index: u32,

    /// Signature over the input's signing digest
    pub signature: Signature,
}

/// Per-round request issued by the device
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      KIND     |  SIG_PRESENT  |            RESERVED           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             INDEX                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          INPUT_INDEX                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                       SIGNATURE (64-byte)                     /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
/// `INPUT_INDEX` and `SIGNATURE` are present when `SIG_PRESENT` is nonzero.
#[derive(Clone, PartialEq, Debug)]
pub struct TxRequest {
    /// What the device wants next
    pub kind: RequestKind,

    /// Which input / output is wanted (zero for `Meta` / `Finished`)
    pub index: u32,

    /// Signature completed in the previous round, if any
    pub signature: Option<SignedInput>,
}

impl TxRequest {
    /// Request transaction input `n`
    pub fn input(n: u32) -> Self {
        Self {
            kind: RequestKind::Input,
            index: n,
            signature: None,
        }
    }

    /// Request transaction output `n`
    pub fn output(n: u32) -> Self {
        Self {
            kind: RequestKind::Output,
            index: n,
            signature: None,
        }
    }

    /// Request transaction metadata
    pub fn meta() -> Self {
        Self {
            kind: RequestKind::Meta,
            index: 0,
            signature: None,
        }
    }

    /// Terminal request, closing the session
    pub fn finished(signature: Option<SignedInput>) -> Self {
        Self {
            kind: RequestKind::Finished,
            index: 0,
            signature,
        }
    }

    /// Attach a streamed signature to the request
    pub fn with_signature(mut self, input_index: u32, signature: Signature) -> Self {
        self.signature = Some(SignedInput {
            input_index,
            signature,
        });
        self
    }

    /// Check whether this is the terminal request kind
    pub fn is_finished(&self) -> bool {
        self.kind == RequestKind::Finished
    }
}

impl Encode for TxRequest {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        let mut n = 8;
        if self.signature.is_some() {
            n += 4 + 64;
        }
        Ok(n)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.len() < self.encode_len()? {
            return Err(WireError::InvalidLength);
        }

        buff[0] = self.kind as u8;
        buff[1] = self.signature.is_some() as u8;
        buff[2] = 0;
        buff[3] = 0;

        let mut n = 4;
        n += le::put_u32(&mut buff[n..], self.index)?;

        if let Some(s) = &self.signature {
            n += le::put_u32(&mut buff[n..], s.input_index)?;
            n += s.signature.encode(&mut buff[n..])?;
        }

        Ok(n)
    }
}

impl DecodeOwned for TxRequest {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        if buff.len() < 8 {
            return Err(WireError::InvalidLength);
        }

        let kind = RequestKind::try_from(buff[0]).map_err(|_| WireError::UnknownKind)?;
        let sig_present = buff[1] != 0;

        let mut n = 4;
        let (index, l) = le::get_u32(&buff[n..])?;
        n += l;

        let signature = match sig_present {
            false => None,
            true => {
                let (input_index, l) = le::get_u32(&buff[n..])?;
                n += l;

                let (signature, l) = Signature::decode_owned(&buff[n..])?;
                n += l;

                Some(SignedInput {
                    input_index,
                    signature,
                })
            }
        };

        Ok((
            Self {
                kind,
                index,
                signature,
            },
            n,
        ))
    }
}
