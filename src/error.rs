//! Unified application error model and mapping helpers.
//! This module provides a common error enum used by the HTTP surface, along
//! with the mapping from engine-local errors to HTTP status classes.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::decide::DecisionError;
use crate::users::SignupError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Unavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Unavailable { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Unavailable { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn unavailable<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unavailable { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Unavailable { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<DecisionError> for AppError {
    fn from(err: DecisionError) -> Self {
        match &err {
            DecisionError::MissingExpression => {
                AppError::user("missing_expression", "group-expression header is required")
            }
            DecisionError::InvalidExpression(parse) => {
                AppError::UserInput { code: "invalid_expression".into(), message: parse.to_string() }
            }
            DecisionError::StoreUnavailable(store) => {
                AppError::Unavailable { code: "store_unavailable".into(), message: store.to_string() }
            }
        }
    }
}

impl From<SignupError> for AppError {
    fn from(err: SignupError) -> Self {
        let message = err.to_string();
        match err {
            SignupError::MissingFields => AppError::UserInput { code: "missing_fields".into(), message },
            SignupError::ReservedGroup(_) => AppError::UserInput { code: "reserved_group".into(), message },
            SignupError::InvalidGroup(_) => AppError::UserInput { code: "invalid_group".into(), message },
            SignupError::UsernameTaken(_) => AppError::Conflict { code: "username_taken".into(), message },
            SignupError::Io(_) => AppError::Unavailable { code: "user_store_unavailable".into(), message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decide::DecisionError;
    use crate::store::StoreError;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::auth("auth", "no").http_status(), 401);
        assert_eq!(AppError::unavailable("store", "down").http_status(), 503);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn decision_errors_map_to_status_classes() {
        let missing: AppError = DecisionError::MissingExpression.into();
        assert_eq!(missing.http_status(), 400);
        assert_eq!(missing.code_str(), "missing_expression");

        let invalid: AppError = DecisionError::InvalidExpression(
            crate::expr::parse("a &&").unwrap_err(),
        )
        .into();
        assert_eq!(invalid.http_status(), 400);
        assert_eq!(invalid.code_str(), "invalid_expression");

        let down: AppError =
            DecisionError::StoreUnavailable(StoreError::Unavailable("no route".into())).into();
        assert_eq!(down.http_status(), 503);
        assert_eq!(down.code_str(), "store_unavailable");
    }
}
