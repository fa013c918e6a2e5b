//! Error taxonomy shared by the simulation, risk, and range components.
//!
//! Soft business-rule rejections (a portfolio VaR over its ceiling, a
//! reward:risk target that cannot be met) are reported as data by the
//! callers, never through this type.

use thiserror::Error;

/// Errors raised by core components.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Too few observations for a statistical estimate.
    #[error("insufficient data for {what}: need {needed}, got {got}")]
    InsufficientData {
        what: String,
        needed: usize,
        got: usize,
    },

    /// Invalid parameter. Fatal: the caller must fix its configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A valid position size could not be computed.
    #[error("sizing error: {0}")]
    Sizing(String),

    /// Timestamps of two series disagree, or a series is out of order.
    #[error("alignment error: {0}")]
    Alignment(String),
}

impl CoreError {
    pub fn insufficient(what: impl Into<String>, needed: usize, got: usize) -> Self {
        Self::InsufficientData {
            what: what.into(),
            needed,
            got,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_names_counts() {
        let err = CoreError::insufficient("historical VaR", 30, 12);
        assert_eq!(
            err.to_string(),
            "insufficient data for historical VaR: need 30, got 12"
        );
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn config_error_is_not_insufficient_data() {
        assert!(!CoreError::config("multiplier must be > 0").is_insufficient_data());
    }
}
