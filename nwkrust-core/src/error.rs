//! Error types for nwkrust-core

use std::fmt;

/// Result type alias for nwkrust operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Line has no content
    #[error("Empty protocol line")]
    EmptyLine,

    /// First character is not a mode symbol
    #[error("Unknown message mode '{0}'")]
    UnknownMode(char),

    /// Only execute and query lines may be queued for sending
    #[error("Illegal mode '{0}' for an outbound command")]
    IllegalMode(char),

    /// Unknown command family
    #[error("Unknown command family: {0}")]
    UnknownCommand(String),

    /// A field that must be numeric is not
    #[error("Invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// Required address field is absent
    #[error("Missing {field} in line {line:?}")]
    MissingField { field: &'static str, line: String },

    /// Feedback carries fewer parameters than its handler needs
    #[error("Malformed feedback: expected at least {expected} parameters, got {actual}")]
    MissingParameter { expected: usize, actual: usize },

    /// Duration parameter cannot be parsed
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    /// Invalid link state transition
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Feedback from the processor could not be interpreted
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::EmptyLine
                | Self::UnknownMode(_)
                | Self::UnknownCommand(_)
                | Self::InvalidNumber { .. }
                | Self::MissingField { .. }
                | Self::MissingParameter { .. }
                | Self::InvalidDuration(_)
        )
    }
}

/// Error code carried by `~ERROR,<code>` replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParameterCount,
    ObjectDoesNotExist,
    InvalidAction,
    ParameterOutOfRange,
    ParameterMalformed,
    UnsupportedCommand,
    Unknown(u32),
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        match self {
            Self::ParameterCount => 1,
            Self::ObjectDoesNotExist => 2,
            Self::InvalidAction => 3,
            Self::ParameterOutOfRange => 4,
            Self::ParameterMalformed => 5,
            Self::UnsupportedCommand => 6,
            Self::Unknown(code) => code,
        }
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::ParameterCount,
            2 => Self::ObjectDoesNotExist,
            3 => Self::InvalidAction,
            4 => Self::ParameterOutOfRange,
            5 => Self::ParameterMalformed,
            6 => Self::UnsupportedCommand,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterCount => f.write_str("parameter count mismatch"),
            Self::ObjectDoesNotExist => f.write_str("object does not exist"),
            Self::InvalidAction => f.write_str("invalid action number"),
            Self::ParameterOutOfRange => f.write_str("parameter out of range"),
            Self::ParameterMalformed => f.write_str("parameter malformed"),
            Self::UnsupportedCommand => f.write_str("unsupported command"),
            Self::Unknown(code) => write!(f, "unknown error code {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_decode() {
        assert_eq!(ErrorCode::from(4).to_string(), "parameter out of range");
        assert_eq!(ErrorCode::from(999).to_string(), "unknown error code 999");
    }

    #[test]
    fn test_error_code_table() {
        let expected = [
            (1, "parameter count mismatch"),
            (2, "object does not exist"),
            (3, "invalid action number"),
            (5, "parameter malformed"),
            (6, "unsupported command"),
        ];
        for (code, text) in expected {
            let decoded = ErrorCode::from(code);
            assert_eq!(decoded.to_string(), text);
            assert_eq!(decoded.code(), code);
        }
    }

    #[test]
    fn test_is_malformed() {
        assert!(Error::MissingParameter { expected: 1, actual: 0 }.is_malformed());
        assert!(!Error::IllegalMode('~').is_malformed());
    }
}
