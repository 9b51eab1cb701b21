#![allow(unused)]
// Copyright (c) 2023-2024 The Coldsign Developers

/// encdec helper module for fixed byte arrays
pub(crate) mod arr {
    use crate::WireError;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, WireError> {
        if buff.len() < d.len() {
            return Err(WireError::InvalidLength);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, WireError> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), WireError> {
        if buff.len() < N {
            return Err(WireError::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Bounds-checked little-endian scalar helpers for hand-written encodings
pub(crate) mod le {
    use crate::WireError;

    pub fn put_u32(buff: &mut [u8], v: u32) -> Result<usize, WireError> {
        if buff.len() < 4 {
            return Err(WireError::InvalidLength);
        }

        buff[..4].copy_from_slice(&v.to_le_bytes());

        Ok(4)
    }

    pub fn get_u32(buff: &[u8]) -> Result<(u32, usize), WireError> {
        if buff.len() < 4 {
            return Err(WireError::InvalidLength);
        }

        let mut b = [0u8; 4];
        b.copy_from_slice(&buff[..4]);

        Ok((u32::from_le_bytes(b), 4))
    }

    pub fn put_u64(buff: &mut [u8], v: u64) -> Result<usize, WireError> {
        if buff.len() < 8 {
            return Err(WireError::InvalidLength);
        }

        buff[..8].copy_from_slice(&v.to_le_bytes());

        Ok(8)
    }

    pub fn get_u64(buff: &[u8]) -> Result<(u64, usize), WireError> {
        if buff.len() < 8 {
            return Err(WireError::InvalidLength);
        }

        let mut b = [0u8; 8];
        b.copy_from_slice(&buff[..8]);

        Ok((u64::from_le_bytes(b), 8))
    }
}

/// encdec helper module for derivation paths
///
/// Paths encode as packed little-endian `u32` elements, the element count
/// is carried in the owning message header.
pub(crate) mod path {
    use crate::{DerivationPath, WireError, MAX_PATH};

    use super::le;

    pub fn enc(p: &DerivationPath, buff: &mut [u8]) -> Result<usize, WireError> {
        let mut n = 0;

        for v in p {
            n += le::put_u32(&mut buff[n..], *v)?;
        }

        Ok(n)
    }

    pub fn enc_len(p: &DerivationPath) -> Result<usize, WireError> {
        Ok(p.len() * 4)
    }

    pub fn dec(buff: &[u8], count: usize) -> Result<(DerivationPath, usize), WireError> {
        if count > MAX_PATH {
            return Err(WireError::InvalidEncoding);
        }

        let mut p = DerivationPath::new();
        let mut n = 0;

        for _ in 0..count {
            let (v, l) = le::get_u32(&buff[n..])?;
            n += l;

            // Infallible, count is bounded above
            let _ = p.push(v);
        }

        Ok((p, n))
    }
}

/// encdec helper module for length-prefixed text fields
pub(crate) mod text {
    use crate::WireError;

    pub fn enc(s: &str, buff: &mut [u8]) -> Result<usize, WireError> {
        let d = s.as_bytes();

        if buff.len() < d.len() {
            return Err(WireError::InvalidLength);
        }

        buff[..d.len()].copy_from_slice(d);

        Ok(d.len())
    }

    pub fn dec<const N: usize>(
        buff: &[u8],
        len: usize,
    ) -> Result<(heapless::String<N>, usize), WireError> {
        if len > N {
            return Err(WireError::InvalidEncoding);
        }
        if buff.len() < len {
            return Err(WireError::InvalidLength);
        }

        let s = core::str::from_utf8(&buff[..len]).map_err(|_| WireError::InvalidEncoding)?;

        let mut v = heapless::String::new();

        // Infallible, len is bounded above
        let _ = v.push_str(s);

        Ok((v, len))
    }
}
