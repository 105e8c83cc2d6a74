// SPF Command Gate - Error Taxonomy
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Runtime errors never leave the dispatcher: they are folded into a
// DispatchReport and a sender-visible message. Build errors abort setup.

use serde::Serialize;
use thiserror::Error;

/// Why a dispatch did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchError {
    #[error("no command found for '{path}'")]
    NotFound { path: String },

    #[error("sender lacks permission '{permission}'")]
    Forbidden { permission: String },

    #[error("too many arguments (maximum {max})")]
    TooManyArgs { max: usize },

    #[error("handler failed: {reason}")]
    HandlerError { reason: String },
}

impl DispatchError {
    /// Short tag used in log lines and report messages
    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "NOT_FOUND",
            DispatchError::Forbidden { .. } => "FORBIDDEN",
            DispatchError::TooManyArgs { .. } => "TOO_MANY_ARGS",
            DispatchError::HandlerError { .. } => "HANDLER_ERROR",
        }
    }
}

/// Construction-time failure. Indicates inconsistent binding declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("misconfigured binding at '{path}': {reason}")]
    MisconfiguredBinding { path: String, reason: String },
}

impl BuildError {
    pub fn misconfigured(path: &[String], reason: impl Into<String>) -> Self {
        BuildError::MisconfiguredBinding {
            path: path.join(" "),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
