use std::path::PathBuf;
use std::time::Duration;

/// Malformed payload of a single reply block.
///
/// Decode errors are isolated to the block that caused them, other blocks of the same
/// reply are still dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty block")]
    EmptyBlock,
    #[error("expect `{expected}` block, got `{found}`")]
    UnexpectedKind {
        expected: &'static str,
        found: String,
    },
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("malformed token `{0}`")]
    MalformedToken(String),
    #[error("invalid hex value in `{field}`: {value:?}")]
    InvalidHex { field: &'static str, value: String },
    #[error("unknown register {0:?}")]
    UnknownRegister(String),
    #[error("value {value:#x} out of range for `{field}`")]
    ValueOutOfRange { field: &'static str, value: u32 },
    #[error("request rejected by target: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- transport errors ------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("debug channel closed")]
    TransportClosed,
    #[error("no reply: `{awaited}` not received in {waited:?}")]
    ProtocolTimeout { awaited: String, waited: Duration },

    // --------------------------------- reply errors ----------------------------------------------
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("program counter not found in status reply")]
    NoProgramCounter,

    // --------------------------------- session errors --------------------------------------------
    #[error("target is running, stop it first")]
    NotStopped,
    #[error("address {0:#x} is out of 24-bit address space")]
    AddressOutOfRange(u32),
    #[error("address window contract violated: first {first:#x} >= last {last:#x}")]
    RangeInvariantViolation { first: i64, last: i64 },

    // --------------------------------- config errors ---------------------------------------------
    #[error("configuration mismatch in {path:?}: {reason}, remove the file and try again")]
    ConfigMismatch { path: PathBuf, reason: String },
    #[error("save configuration: {0}")]
    ConfigSave(#[from] toml::ser::Error),
}

impl Error {
    /// Return a hint to an interface - continue debugging after error or stop whole process.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::IO(_) => false,
            Error::ProtocolTimeout { .. } => false,
            Error::Decode(_) => false,
            Error::NoProgramCounter => false,
            Error::NotStopped => false,
            Error::AddressOutOfRange(_) => false,
            Error::ConfigMismatch { .. } => false,
            Error::ConfigSave(_) => false,

            // currently fatal errors
            Error::TransportClosed => true,
            Error::RangeInvariantViolation { .. } => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "session", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "session", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
