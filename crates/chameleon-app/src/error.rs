//! Application errors and their exit codes.

use crate::config::ConfigError;
use chameleon_core::{DecodeError, ExprError, FormatError, PickError};
use chameleon_x11::X11Error;
use thiserror::Error;

/// Everything that can end a run unsuccessfully.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Display error: {0}")]
    Display(#[from] X11Error),
    #[error("Invalid seed color: {0}")]
    Seed(#[from] DecodeError),
    #[error("Invalid output format: {0}")]
    Format(#[from] FormatError),
    #[error("Invalid conversion expression: {error}")]
    Conversion {
        expression: String,
        #[source]
        error: ExprError,
    },
    #[error(transparent)]
    Pick(#[from] PickError),
}

/// Result type for the application.
pub type AppResult<T> = Result<T, AppError>;

fn expr_exit_code(error: &ExprError) -> u8 {
    match error {
        ExprError::Syntax { .. } => 4,
        ExprError::UnboundName(_) => 5,
        ExprError::Domain(_) => 6,
        ExprError::Division(_) => 7,
        ExprError::Type(_) => 10,
    }
}

impl AppError {
    /// Process exit code for this error. Usage errors (2) are reported by
    /// clap before a run starts.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Display(_) => 1,
            AppError::Pick(PickError::Backend(_) | PickError::Io(_)) => 1,
            AppError::Pick(PickError::Cancelled) => 3,
            AppError::Conversion { error, .. } | AppError::Pick(PickError::Expr(error)) => expr_exit_code(error),
            AppError::Format(_) | AppError::Pick(PickError::Format(_)) => 8,
            AppError::Seed(_) | AppError::Pick(PickError::Decode(_)) => 9,
        }
    }

    /// Source line with a caret under the offending column, for syntax
    /// errors in the conversion expression.
    pub fn diagnostic(&self) -> Option<String> {
        let AppError::Conversion {
            expression,
            error: ExprError::Syntax { offset, .. },
        } = self
        else {
            return None;
        };
        let column = expression.get(..*offset).map_or(*offset, |prefix| prefix.chars().count());
        Some(format!("  {}\n  {}^", expression, " ".repeat(column)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chameleon_core::parse;

    fn conversion(expression: &str) -> AppError {
        let error = parse(expression).unwrap_err();
        AppError::Conversion {
            expression: expression.to_string(),
            error,
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Config(ConfigError::Invalid("x".into())).exit_code(), 1);
        assert_eq!(AppError::Pick(PickError::Backend("x".into())).exit_code(), 1);
        assert_eq!(AppError::Pick(PickError::Cancelled).exit_code(), 3);
        assert_eq!(conversion("(1+2").exit_code(), 4);
        assert_eq!(AppError::Pick(PickError::Expr(ExprError::UnboundName("x".into()))).exit_code(), 5);
        assert_eq!(AppError::Pick(PickError::Expr(ExprError::Domain("x".into()))).exit_code(), 6);
        assert_eq!(AppError::Pick(PickError::Expr(ExprError::Division("x".into()))).exit_code(), 7);
        assert_eq!(AppError::Format(FormatError::MixedNumbering).exit_code(), 8);
        assert_eq!(AppError::Seed(DecodeError::InvalidHex("x".into())).exit_code(), 9);
        assert_eq!(AppError::Pick(PickError::Expr(ExprError::Type("x".into()))).exit_code(), 10);
    }

    #[test]
    fn test_syntax_diagnostic() {
        assert_eq!(conversion("1 2").diagnostic().as_deref(), Some("  1 2\n    ^"));
        assert_eq!(conversion("(1+2").diagnostic().as_deref(), Some("  (1+2\n      ^"));
        assert_eq!(AppError::Pick(PickError::Cancelled).diagnostic(), None);
    }
}
