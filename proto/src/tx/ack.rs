// Copyright (c) 2023-2024 The Coldsign Developers

//! Host acknowledgement payloads, answering [`TxRequest`][super::TxRequest]s

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::{Display, EnumString};

use crate::{
    helpers::{arr, le, path, text},
    DerivationPath, WireError, MAX_ADDRESS,
};

use super::RequestKind;

/// Input flag bits, carried in the [`TxInput`] header
const INPUT_FLAG_MULTISIG: u8 = 1 << 0;

/// Multisig spend descriptor for an input
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Multisig {
    /// Required signature count
    pub m: u8,

    /// Total cosigner count
    pub n: u8,
}

/// One transaction input as provided by the host
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    PATH_LEN   | SCRIPT_VERSION|     FLAGS     |    RESERVED   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           PREV_INDEX                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            SEQUENCE                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             AMOUNT                            |
/// |                         (u64, 8-byte)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// /                      PREV_HASH (32-byte)                      /
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   MULTISIG_M  |   MULTISIG_N  |            RESERVED           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      PATH (4 * PATH_LEN)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
/// The `MULTISIG` word is present when `FLAGS & 0x01` is set.
#[derive(Clone, PartialEq, Debug)]
pub struct TxInput {
    /// Derivation path for the key spending this input
    pub address_n: DerivationPath,

    /// Previous transaction hash
    pub prev_hash: [u8; 32],

    /// Previous transaction output index
    pub prev_index: u32,

    /// Sequence number
    pub sequence: u32,

    /// Input value
    pub amount: u64,

    /// Script version (Decred, zero elsewhere)
    pub script_version: u8,

    /// Multisig descriptor, if the input is a multisig spend
    pub multisig: Option<Multisig>,
}

impl TxInput {
    /// Create a plain single-sig input
    pub fn new(address_n: &[u32], prev_hash: [u8; 32], prev_index: u32, amount: u64) -> Self {
        Self {
            address_n: DerivationPath::from_slice(address_n).unwrap_or_default(),
            prev_hash,
            prev_index,
            sequence: 0xffff_ffff,
            amount,
            script_version: 0,
            multisig: None,
        }
    }
}

impl Encode for TxInput {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        let mut n = 4 + 4 + 4 + 8 + 32;
        if self.multisig.is_some() {
            n += 4;
        }
        n += self.address_n.len() * 4;
        Ok(n)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.len() < self.encode_len()? {
            return Err(WireError::InvalidLength);
        }

        let mut flags = 0;
        if self.multisig.is_some() {
            flags |= INPUT_FLAG_MULTISIG;
        }

        buff[0] = self.address_n.len() as u8;
        buff[1] = self.script_version;
        buff[2] = flags;
        buff[3] = 0;

        let mut n = 4;
        n += le::put_u32(&mut buff[n..], self.prev_index)?;
        n += le::put_u32(&mut buff[n..], self.sequence)?;
        n += le::put_u64(&mut buff[n..], self.amount)?;
        n += arr::enc(&self.prev_hash, &mut buff[n..])?;

        if let Some(m) = &self.multisig {
            buff[n] = m.m;
            buff[n + 1] = m.n;
            buff[n + 2] = 0;
            buff[n + 3] = 0;
            n += 4;
        }

        n += path::enc(&self.address_n, &mut buff[n..])?;

        Ok(n)
    }
}

impl DecodeOwned for TxInput {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        if buff.len() < 4 {
            return Err(WireError::InvalidLength);
        }

        let path_len = buff[0] as usize;
        let script_version = buff[1];
        let flags = buff[2];

        let mut n = 4;
        let (prev_index, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (sequence, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (amount, l) = le::get_u64(&buff[n..])?;
        n += l;
        let (prev_hash, l) = arr::dec(&buff[n..])?;
        n += l;

        let multisig = match flags & INPUT_FLAG_MULTISIG != 0 {
            false => None,
            true => {
                if buff.len() < n + 4 {
                    return Err(WireError::InvalidLength);
                }
                let m = Multisig {
                    m: buff[n],
                    n: buff[n + 1],
                };
                n += 4;
                Some(m)
            }
        };

        let (address_n, l) = path::dec(&buff[n..], path_len)?;
        n += l;

        Ok((
            Self {
                address_n,
                prev_hash,
                prev_index,
                sequence,
                amount,
                script_version,
                multisig,
            },
            n,
        ))
    }
}

/// Output script templates understood by the signers
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum OutputScriptType {
    /// Standard pay-to-address output
    PayToAddress = 0x00,
    /// Pay-to-script-hash output
    PayToScriptHash = 0x01,
    /// Data-carrier output, zero value
    OpReturn = 0x02,
}

/// One transaction output as provided by the host
///
/// Outputs carry either a destination `address` or an `address_n`
/// derivation path (for change back to the device), never both.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    ADDR_LEN   |    PATH_LEN   |  SCRIPT_TYPE  |    RESERVED   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             AMOUNT                            |
/// |                         (u64, 8-byte)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                       ADDRESS (ADDR_LEN)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      PATH (4 * PATH_LEN)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct TxOutput {
    /// Destination address (empty for change outputs)
    pub address: heapless::String<MAX_ADDRESS>,

    /// Change derivation path (empty for addressed outputs)
    pub address_n: DerivationPath,

    /// Output value
    pub amount: u64,

    /// Script template for the output
    pub script_type: OutputScriptType,
}

impl TxOutput {
    /// Create an addressed output
    pub fn to_address(address: &str, amount: u64) -> Self {
        let mut a = heapless::String::new();
        let _ = a.push_str(address);

        Self {
            address: a,
            address_n: DerivationPath::new(),
            amount,
            script_type: OutputScriptType::PayToAddress,
        }
    }

    /// Create a change output addressed by derivation path
    pub fn to_path(address_n: &[u32], amount: u64) -> Self {
        Self {
            address: heapless::String::new(),
            address_n: DerivationPath::from_slice(address_n).unwrap_or_default(),
            amount,
            script_type: OutputScriptType::PayToAddress,
        }
    }
}

impl Encode for TxOutput {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        Ok(4 + 8 + self.address.len() + self.address_n.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.len() < self.encode_len()? {
            return Err(WireError::InvalidLength);
        }

        buff[0] = self.address.len() as u8;
        buff[1] = self.address_n.len() as u8;
        buff[2] = self.script_type as u8;
        buff[3] = 0;

        let mut n = 4;
        n += le::put_u64(&mut buff[n..], self.amount)?;
        n += text::enc(&self.address, &mut buff[n..])?;
        n += path::enc(&self.address_n, &mut buff[n..])?;

        Ok(n)
    }
}

impl DecodeOwned for TxOutput {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        if buff.len() < 4 {
            return Err(WireError::InvalidLength);
        }

        let addr_len = buff[0] as usize;
        let path_len = buff[1] as usize;
        let script_type =
            OutputScriptType::try_from(buff[2]).map_err(|_| WireError::UnknownKind)?;

        let mut n = 4;
        let (amount, l) = le::get_u64(&buff[n..])?;
        n += l;
        let (address, l) = text::dec(&buff[n..], addr_len)?;
        n += l;
        let (address_n, l) = path::dec(&buff[n..], path_len)?;
        n += l;

        Ok((
            Self {
                address,
                address_n,
                amount,
                script_type,
            },
            n,
        ))
    }
}

/// Transaction metadata, answering a [`RequestKind::Meta`] request
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        VERSION_GROUP_ID                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           BRANCH_ID                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             EXPIRY                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TxMeta {
    /// Transaction version group (version-negotiated coins)
    pub version_group_id: u32,

    /// Consensus branch the transaction commits to
    pub branch_id: u32,

    /// Expiry height (zero when unused)
    pub expiry: u32,
}

impl Encode for TxMeta {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        Ok(12)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        let mut n = 0;
        n += le::put_u32(&mut buff[n..], self.version_group_id)?;
        n += le::put_u32(&mut buff[n..], self.branch_id)?;
        n += le::put_u32(&mut buff[n..], self.expiry)?;
        Ok(n)
    }
}

impl DecodeOwned for TxMeta {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        let mut n = 0;
        let (version_group_id, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (branch_id, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (expiry, l) = le::get_u32(&buff[n..])?;
        n += l;

        Ok((
            Self {
                version_group_id,
                branch_id,
                expiry,
            },
            n,
        ))
    }
}

/// Host acknowledgement, answering the previous [`TxRequest`][super::TxRequest]
///
/// Encodes as the answered request kind followed by the payload body.
#[derive(Clone, PartialEq, Debug)]
pub enum TxAck {
    /// Input payload, answering [`RequestKind::Input`]
    Input(TxInput),

    /// Output payload, answering [`RequestKind::Output`]
    Output(TxOutput),

    /// Metadata payload, answering [`RequestKind::Meta`]
    Meta(TxMeta),
}

impl TxAck {
    /// Fetch the request kind this acknowledgement answers
    pub fn kind(&self) -> RequestKind {
        match self {
            TxAck::Input(..) => RequestKind::Input,
            TxAck::Output(..) => RequestKind::Output,
            TxAck::Meta(..) => RequestKind::Meta,
        }
    }
}

impl Encode for TxAck {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        let body = match self {
            TxAck::Input(v) => v.encode_len()?,
            TxAck::Output(v) => v.encode_len()?,
            TxAck::Meta(v) => v.encode_len()?,
        };
        Ok(1 + body)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.is_empty() {
            return Err(WireError::InvalidLength);
        }

        buff[0] = self.kind() as u8;

        let n = match self {
            TxAck::Input(v) => v.encode(&mut buff[1..])?,
            TxAck::Output(v) => v.encode(&mut buff[1..])?,
            TxAck::Meta(v) => v.encode(&mut buff[1..])?,
        };

        Ok(1 + n)
    }
}

impl DecodeOwned for TxAck {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(<Self as DecodeOwned>::Output, usize), WireError> {
        if buff.is_empty() {
            return Err(WireError::InvalidLength);
        }

        let kind = RequestKind::try_from(buff[0]).map_err(|_| WireError::UnknownKind)?;

        let (ack, n) = match kind {
            RequestKind::Input => {
                let (v, n) = TxInput::decode_owned(&buff[1..])?;
                (TxAck::Input(v), n)
            }
            RequestKind::Output => {
                let (v, n) = TxOutput::decode_owned(&buff[1..])?;
                (TxAck::Output(v), n)
            }
            RequestKind::Meta => {
                let (v, n) = TxMeta::decode_owned(&buff[1..])?;
                (TxAck::Meta(v), n)
            }
            RequestKind::Finished => return Err(WireError::UnknownKind),
        };

        Ok((ack, 1 + n))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_msg;

    #[test]
    fn encode_decode_input() {
        let mut buff = [0u8; 256];

        let mut i = TxInput::new(
            &[0x8000002c, 0x80000000, 0x80000000, 0, 5],
            [0xaa; 32],
            1,
            1_000_000,
        );
        let n = encode_decode_msg(&mut buff, &i);
        assert_eq!(n, 52 + 5 * 4);

        i.multisig = Some(Multisig { m: 2, n: 3 });
        let n = encode_decode_msg(&mut buff, &i);
        assert_eq!(n, 52 + 4 + 5 * 4);
    }

    #[test]
    fn encode_decode_output() {
        let mut buff = [0u8; 256];

        let o = TxOutput::to_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", 90_000);
        let n = encode_decode_msg(&mut buff, &o);
        assert_eq!(n, 12 + 34);

        let c = TxOutput::to_path(&[0x8000002c, 0x80000000, 0x80000000, 1, 0], 9_000);
        let n = encode_decode_msg(&mut buff, &c);
        assert_eq!(n, 12 + 5 * 4);
    }

    #[test]
    fn encode_decode_ack() {
        let mut buff = [0u8; 256];

        encode_decode_msg(
            &mut buff,
            &TxAck::Meta(TxMeta {
                version_group_id: 0x892f2085,
                branch_id: 0x76b809bb,
                expiry: 0,
            }),
        );

        encode_decode_msg(
            &mut buff,
            &TxAck::Output(TxOutput::to_address("DsQxuVRvS4eaJ42dhQEsCXauMWjvopWgrVg", 1)),
        );
    }
}
