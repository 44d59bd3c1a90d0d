//! Structured error types for the audit engine.
//!
//! Only whole-invocation failures live here. Malformed lines, missing event
//! ids and unknown uids are expected in real logs and never become errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("log not found: {path}")]
  LogNotFound { path: String },

  #[error("cannot open {path}: {source}")]
  Unreadable {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("identity database {path}: {source}")]
  IdentityDb {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("read: {0}")]
  Io(#[from] std::io::Error),

  #[error("parse: {0}")]
  Parse(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }

  /// Failure category reported across the helper process boundary.
  pub fn category(&self) -> &'static str {
    match self {
      Self::LogNotFound { .. } | Self::Unreadable { .. } => "log_not_found",
      Self::IdentityDb { .. } | Self::Io(_) | Self::Parse(_) | Self::Json(_) => "parse_error",
    }
  }
}
