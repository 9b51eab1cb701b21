// Copyright (c) 2023-2024 The Coldsign Developers

//! No-alloc formatting helpers for confirmation surfaces

use core::str::from_utf8;

use emstr::EncodeStr;

/// Base units per coin
const COIN_SCALAR: u64 = 100_000_000;

/// Fractional digits at full precision
const COIN_DECIMALS: usize = 8;

/// Hardened derivation marker
const HARDENED: u32 = 0x8000_0000;

/// Format a base-unit value as a decimal coin amount with ticker,
/// trailing zeros trimmed
pub fn fmt_coin_val<'a>(value: u64, ticker: &str, buff: &'a mut [u8]) -> &'a str {
    let whole = value / COIN_SCALAR;
    let mut frac = value % COIN_SCALAR;

    let mut n = match emstr::write!(&mut buff[..], whole) {
        Ok(v) => v,
        Err(_) => return "ENCODE_ERR",
    };

    if frac != 0 {
        let mut digits = COIN_DECIMALS;
        while frac % 10 == 0 {
            frac /= 10;
            digits -= 1;
        }

        let mut width = 0;
        let mut x = frac;
        while x != 0 {
            x /= 10;
            width += 1;
        }

        match emstr::write!(&mut buff[n..], '.') {
            Ok(v) => n += v,
            Err(_) => return "ENCODE_ERR",
        }

        // Zero-pad between the point and the first significant digit
        for _ in width..digits {
            match emstr::write!(&mut buff[n..], '0') {
                Ok(v) => n += v,
                Err(_) => return "ENCODE_ERR",
            }
        }

        match emstr::write!(&mut buff[n..], frac) {
            Ok(v) => n += v,
            Err(_) => return "ENCODE_ERR",
        }
    }

    match emstr::write!(&mut buff[n..], ' ', ticker) {
        Ok(v) => n += v,
        Err(_) => return "ENCODE_ERR",
    }

    match from_utf8(&buff[..n]) {
        Ok(v) => v,
        Err(_) => "ENCODE_ERR",
    }
}

/// Format a derivation path in the usual `m/44'/0'/0'/1/0` notation
pub fn fmt_path<'a>(path: &[u32], buff: &'a mut [u8]) -> &'a str {
    let mut n = match emstr::write!(&mut buff[..], 'm') {
        Ok(v) => v,
        Err(_) => return "ENCODE_ERR",
    };

    for p in path {
        let r = match p & HARDENED != 0 {
            true => emstr::write!(&mut buff[n..], '/', p & !HARDENED, '\''),
            false => emstr::write!(&mut buff[n..], '/', *p),
        };

        match r {
            Ok(v) => n += v,
            Err(_) => return "ENCODE_ERR",
        }
    }

    match from_utf8(&buff[..n]) {
        Ok(v) => v,
        Err(_) => "ENCODE_ERR",
    }
}
