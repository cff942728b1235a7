//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the credential
//! adapter, session manager and backend gateway, along with helpers to
//! classify failures for the degrade-or-surface policy.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// External identity provider could not be constructed or driven.
    Provider { code: String, message: String },
    /// Network unreachable or a non-2xx backend reply.
    Transport { code: String, message: String },
    /// Login/refresh rejected by the backend.
    Auth { code: String, message: String },
    /// Session state problems (missing token, invalid identity).
    Session { code: String, message: String },
    /// Durable key-value storage failures.
    Storage { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Provider { code, .. }
            | AppError::Transport { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Session { code, .. }
            | AppError::Storage { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Provider { message, .. }
            | AppError::Transport { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Session { message, .. }
            | AppError::Storage { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn provider(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Provider { code: code.into(), message: msg.into() } }
    pub fn transport(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Transport { code: code.into(), message: msg.into() } }
    pub fn auth(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn session(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Session { code: code.into(), message: msg.into() } }
    pub fn storage(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Storage { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Transport and auth failures have a client-side fallback path; the rest
    /// must be surfaced to the caller.
    pub fn is_degradable(&self) -> bool {
        matches!(self, AppError::Transport { .. } | AppError::Auth { .. })
    }

    /// Fatal errors make authentication unavailable until retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Provider { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport { code: "http_error".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal { code: "decode_error".into(), message: err.to_string() }
    }
}
