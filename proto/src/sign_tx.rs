// Copyright (c) 2023-2024 The Coldsign Developers

//! Session-initiating message

use encdec::{DecodeOwned, Encode};

use crate::{
    helpers::{le, text},
    WireError, MAX_COIN_NAME,
};

/// Transaction signing request, opens a signing session
///
/// Carries the transaction frame; inputs and outputs are streamed
/// afterwards in response to per-round requests.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    NAME_LEN   |                    RESERVED                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          INPUTS_COUNT                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         OUTPUTS_COUNT                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            VERSION                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           LOCK_TIME                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             EXPIRY                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                       COIN_NAME (NAME_LEN)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SignTx {
    /// Coin name, empty selects the platform's canonical coin
    pub coin_name: heapless::String<MAX_COIN_NAME>,

    /// Number of inputs to be streamed
    pub inputs_count: u32,

    /// Number of outputs to be streamed
    pub outputs_count: u32,

    /// Transaction version
    pub version: u32,

    /// Transaction lock time
    pub lock_time: u32,

    /// Expiry height (Decred / version-negotiated coins, zero elsewhere)
    pub expiry: u32,
}

impl SignTx {
    /// Create a new signing request
    pub fn new(coin_name: Option<&str>, inputs_count: u32, outputs_count: u32) -> Self {
        let mut name = heapless::String::new();
        if let Some(c) = coin_name {
            let _ = name.push_str(c);
        }

        Self {
            coin_name: name,
            inputs_count,
            outputs_count,
            version: 1,
            lock_time: 0,
            expiry: 0,
        }
    }

    /// Fetch the requested coin name, `None` when absent
    pub fn coin_name(&self) -> Option<&str> {
        match self.coin_name.is_empty() {
            true => None,
            false => Some(&self.coin_name),
        }
    }
}

impl Encode for SignTx {
    type Error = WireError;

    fn encode_len(&self) -> Result<usize, WireError> {
        Ok(4 + 5 * 4 + self.coin_name.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.len() < self.encode_len()? {
            return Err(WireError::InvalidLength);
        }

        buff[0] = self.coin_name.len() as u8;
        buff[1] = 0;
        buff[2] = 0;
        buff[3] = 0;

        let mut n = 4;
        n += le::put_u32(&mut buff[n..], self.inputs_count)?;
        n += le::put_u32(&mut buff[n..], self.outputs_count)?;
        n += le::put_u32(&mut buff[n..], self.version)?;
        n += le::put_u32(&mut buff[n..], self.lock_time)?;
        n += le::put_u32(&mut buff[n..], self.expiry)?;
        n += text::enc(&self.coin_name, &mut buff[n..])?;

        Ok(n)
    }
}

impl DecodeOwned for SignTx {
    type Output = Self;

    type Error = WireError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), WireError> {
        if buff.len() < 4 {
            return Err(WireError::InvalidLength);
        }

        let name_len = buff[0] as usize;

        let mut n = 4;
        let (inputs_count, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (outputs_count, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (version, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (lock_time, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (expiry, l) = le::get_u32(&buff[n..])?;
        n += l;
        let (coin_name, l) = text::dec(&buff[n..], name_len)?;
        n += l;

        Ok((
            Self {
                coin_name,
                inputs_count,
                outputs_count,
                version,
                lock_time,
                expiry,
            },
            n,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_msg;

    #[test]
    fn encode_decode_sign_tx() {
        let mut buff = [0u8; 64];

        let n = encode_decode_msg(&mut buff, &SignTx::new(None, 2, 2));
        assert_eq!(n, 24);

        let n = encode_decode_msg(&mut buff, &SignTx::new(Some("Zcash"), 1, 1));
        assert_eq!(n, 24 + 5);
    }

    #[test]
    fn absent_coin_name() {
        assert_eq!(SignTx::new(None, 1, 1).coin_name(), None);
        assert_eq!(SignTx::new(Some("Decred"), 1, 1).coin_name(), Some("Decred"));
    }
}
