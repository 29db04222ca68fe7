//! Domain error types.

use crate::domain::position::Side;

/// Top-level error type for tradeledger.
///
/// The first six variants are broken invariants or engine misuse. They abort
/// the current run and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("order index {index} is already outstanding")]
    DuplicateOrderIndex { index: u64 },

    #[error("order index {index} is not outstanding")]
    UnknownOrder { index: u64 },

    #[error("insufficient {side} position in {instrument}: have {held}, need {requested}")]
    InsufficientPosition {
        instrument: String,
        side: Side,
        held: u64,
        requested: u64,
    },

    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },

    #[error("strategy {name} is already registered")]
    DuplicateStrategy { name: String },

    #[error("strategy {name} is not registered")]
    UnknownStrategy { name: String },

    #[error("no market data for {instrument}")]
    MissingMarketData { instrument: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LedgerError::InvalidEvent {
            reason: reason.into(),
        }
    }

    /// Process exit status for this error's family.
    pub fn exit_status(&self) -> u8 {
        match self {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Data { .. }
            | LedgerError::Export { .. }
            | LedgerError::MissingMarketData { .. } => 3,
            LedgerError::DuplicateOrderIndex { .. }
            | LedgerError::UnknownOrder { .. }
            | LedgerError::InsufficientPosition { .. }
            | LedgerError::InvalidEvent { .. }
            | LedgerError::DuplicateStrategy { .. }
            | LedgerError::UnknownStrategy { .. } => 4,
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
