// Copyright (c) 2023-2024 The Coldsign Developers

//! Signing error taxonomy and the wire-visible fault it collapses into

use num_enum::TryFromPrimitive;

/// Fault codes, mirroring the transport layer's failure message
#[derive(Copy, Clone, PartialEq, Debug, TryFromPrimitive)]
#[repr(u8)]
pub enum FaultCode {
    /// Message arrived out of protocol order
    UnexpectedMessage = 0x01,

    /// Request or transaction data is invalid
    DataError = 0x02,

    /// User rejected a confirmation
    ActionCancelled = 0x04,

    /// Internal processing failure
    ProcessError = 0x09,

    /// Outputs exceed inputs
    NotEnoughFunds = 0x0a,

    /// Device-side contract violation
    FirmwareError = 0x63,
}

/// Signing errors raised by the signer implementations
///
/// The general `Signing` category carries its own fault code; the
/// remaining categories always surface as [`FaultCode::DataError`].
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// General transaction construction failure
    #[cfg_attr(feature = "thiserror", error("{1}"))]
    Signing(FaultCode, &'static str),

    /// Inconsistent multisig descriptor
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Multisig(&'static str),

    /// Malformed or unrecognised address / path
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Address(&'static str),

    /// Malformed script template
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Script(&'static str),

    /// Coin table lookup failed
    #[cfg_attr(feature = "thiserror", error("Unsupported coin name"))]
    CoinUnknown,

    /// Signer resumed with a value answering no outstanding step
    #[cfg_attr(feature = "thiserror", error("Invalid signing instruction"))]
    UnexpectedResume,
}

impl Error {
    /// Invalid request / transaction data
    pub(crate) fn data(msg: &'static str) -> Self {
        Error::Signing(FaultCode::DataError, msg)
    }

    /// Internal processing failure
    pub(crate) fn process(msg: &'static str) -> Self {
        Error::Signing(FaultCode::ProcessError, msg)
    }

    /// User rejected a confirmation
    pub(crate) fn cancelled() -> Self {
        Error::Signing(FaultCode::ActionCancelled, "Signing cancelled")
    }

    /// Fetch the human-readable message for the error
    pub fn message(&self) -> &'static str {
        match self {
            Error::Signing(_, m) => m,
            Error::Multisig(m) => m,
            Error::Address(m) => m,
            Error::Script(m) => m,
            Error::CoinUnknown => "Unsupported coin name",
            Error::UnexpectedResume => "Invalid signing instruction",
        }
    }
}

/// Uniform error envelope surfaced to the host
///
/// Constructed only at the session boundary; the host observes one
/// fault shape regardless of which internal category was raised.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[cfg_attr(feature = "thiserror", error("{message}"))]
pub struct Fault {
    /// Wire fault code
    pub code: FaultCode,

    /// Message carried from the originating error
    pub message: &'static str,
}

impl Fault {
    /// Fault for signer calls after a terminal state
    pub(crate) const TERMINAL: Fault = Fault {
        code: FaultCode::FirmwareError,
        message: "Session already terminated",
    };

    /// Fault for transport failures mid-session
    pub(crate) const TRANSPORT: Fault = Fault {
        code: FaultCode::ProcessError,
        message: "Transport failure",
    };
}

impl From<Error> for Fault {
    fn from(e: Error) -> Self {
        let code = match e {
            Error::Signing(code, _) => code,
            Error::Multisig(..) | Error::Address(..) | Error::Script(..) | Error::CoinUnknown => {
                FaultCode::DataError
            }
            Error::UnexpectedResume => FaultCode::FirmwareError,
        };

        Fault {
            code,
            message: e.message(),
        }
    }
}
