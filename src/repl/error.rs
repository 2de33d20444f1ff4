//! REPL error types
//!
//! Every variant except [`ReplError::SessionClosed`] and
//! [`ReplError::Config`] is recovered locally by the session and rendered
//! inline as an error line.

use thiserror::Error;

use crate::util::config::ConfigError;

/// Errors produced by the session engine.
#[derive(Debug, Error)]
pub enum ReplError {
    /// A continuation block without a head line
    #[error("illegal line continuation")]
    MalformedContinuation,

    /// A meta-command that does not parse or match the command table
    #[error("invalid command")]
    InvalidCommand,

    /// An argument-less command received arguments
    #[error("arguments not allowed")]
    ArgumentsNotAllowed,

    /// An argument of the wrong type or out of range
    #[error("invalid {what}: {value}")]
    InvalidArgument {
        /// Which argument was rejected (`buffer`, `window`, `indent`)
        what: &'static str,
        /// The text the user supplied
        value: String,
    },

    /// A context override that no longer refers to a live handle
    #[error("invalid {what} context, reset to none")]
    StaleContext {
        /// `buffer` or `window`
        what: &'static str,
    },

    /// The backing buffer is gone
    #[error("session buffer {0} is no longer valid")]
    SessionClosed(u32),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for session operations
pub type ReplResult<T> = Result<T, ReplError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = ReplError::InvalidArgument {
            what: "buffer",
            value: "99999".to_string(),
        };
        assert_eq!(err.to_string(), "invalid buffer: 99999");
    }

    #[test]
    fn test_inline_messages() {
        assert_eq!(ReplError::InvalidCommand.to_string(), "invalid command");
        assert_eq!(
            ReplError::ArgumentsNotAllowed.to_string(),
            "arguments not allowed"
        );
        assert_eq!(
            ReplError::MalformedContinuation.to_string(),
            "illegal line continuation"
        );
    }
}
