// Copyright (c) 2023-2024 The Coldsign Developers

//! Prelude to simplify downstream use of protocol objects
//!

pub use crate::{
    sign_tx::SignTx,
    tx::{
        Multisig, OutputScriptType, RequestKind, Signature, SignedInput, TxAck, TxInput, TxMeta,
        TxOutput, TxRequest,
    },
    DerivationPath, WireError, MAX_ADDRESS, MAX_COIN_NAME, MAX_PATH,
};
