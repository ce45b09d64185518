// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the cogent tool execution engine.
//!
//! This module provides strongly-typed errors for the engine and its
//! collaborators, using `thiserror` for ergonomic error definitions and
//! `anyhow` for error propagation at initialization edges.

use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// The variants map onto the engine's error taxonomy: invalid input,
/// unknown names, traversal/policy rejections, timeouts, terminal state
/// violations, missing collaborators, and passed-through I/O failures.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("Blocked by policy: {0}")]
    PolicyBlocked(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Terminal(String),

    #[error("Not available: {0}")]
    NotAvailable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Response truncated: {0}")]
    Truncated(String),
}

impl ToolError {
    /// Check if this error should be reported back to the model.
    pub fn is_reportable(&self) -> bool {
        // All tool errors are reported so the model can try alternatives
        true
    }

    /// Check if this error is a terminal-state violation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("invalid JSON: failed to parse: {err}"))
    }
}

/// Result type alias using anyhow for flexible error handling at the edges.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let tool_err: ToolError = io_err.into();
        assert!(matches!(tool_err, ToolError::FileNotFound(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let tool_err: ToolError = io_err.into();
        assert!(matches!(tool_err, ToolError::PermissionDenied(_)));
    }

    #[test]
    fn test_tool_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: ToolError = result.unwrap_err().into();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_error_display() {
        let err = ToolError::Timeout(30_000);
        assert!(err.to_string().contains("30000"));

        let err = ToolError::PolicyBlocked("dangerous command: sudo".to_string());
        assert!(err.to_string().contains("dangerous"));
    }

    #[test]
    fn test_terminal_predicate() {
        assert!(ToolError::Terminal("investigation already completed".into()).is_terminal());
        assert!(!ToolError::NotFound("x".into()).is_terminal());
    }
}
