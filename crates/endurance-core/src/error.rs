//! Error taxonomy for the panel engine.
//!
//! Construction and validation errors are raised synchronously by the call
//! that violates the contract. [`EngineError::Persistence`] is the one
//! recoverable runtime failure: the in-memory state stays authoritative and
//! the error is only reported.

use std::fmt;

/// Every error the engine can surface.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed channel construction (bounds inverted, seed out of range,
    /// non-finite numbers, negative drift amplitude).
    InvalidRange {
        channel: String,
        detail: String,
    },
    /// Log append with blank content.
    EmptyContent,
    /// Durable storage read or write failure.
    Persistence { key: String, detail: String },
    /// A panel was asked about a channel it does not own.
    UnknownChannel { panel: String, channel: String },
    /// A panel was asked to drive a control it does not own.
    UnknownControl { panel: String, control: String },
    /// No panel preset or live panel with this name.
    UnknownPanel { panel: String },
    /// The control exists but is of a different kind than the action needs.
    ControlKindMismatch {
        control: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// Two channels or two controls in one panel share an id.
    DuplicateId { panel: String, id: String },
    /// Unreadable or invalid configuration file.
    Config { path: String, detail: String },
}

impl EngineError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => "END-0001",
            Self::EmptyContent => "END-0002",
            Self::Persistence { .. } => "END-0003",
            Self::UnknownChannel { .. } => "END-0004",
            Self::UnknownControl { .. } => "END-0005",
            Self::UnknownPanel { .. } => "END-0006",
            Self::ControlKindMismatch { .. } => "END-0007",
            Self::DuplicateId { .. } => "END-0008",
            Self::Config { .. } => "END-0009",
        }
    }

    /// True for failures the caller can shrug off and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EmptyContent | Self::Persistence { .. })
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { channel, detail } => {
                write!(f, "invalid range for channel `{channel}`: {detail}")
            }
            Self::EmptyContent => write!(f, "log entry content is empty"),
            Self::Persistence { key, detail } => {
                write!(f, "persistence failure for `{key}`: {detail}")
            }
            Self::UnknownChannel { panel, channel } => {
                write!(f, "panel `{panel}` has no channel `{channel}`")
            }
            Self::UnknownControl { panel, control } => {
                write!(f, "panel `{panel}` has no control `{control}`")
            }
            Self::UnknownPanel { panel } => write!(f, "unknown panel `{panel}`"),
            Self::ControlKindMismatch {
                control,
                expected,
                actual,
            } => write!(
                f,
                "control `{control}` is a {actual} control, expected {expected}"
            ),
            Self::DuplicateId { panel, id } => {
                write!(f, "panel `{panel}` already defines `{id}`")
            }
            Self::Config { path, detail } => write!(f, "config `{path}`: {detail}"),
        }
    }
}

impl std::error::Error for EngineError {}
