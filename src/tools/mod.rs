// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool system for the cogent engine.
//!
//! This module provides the infrastructure for defining and executing tools
//! that the AI model can call to interact with the filesystem, run commands,
//! fetch URLs, and manage investigations.
//!
//! # Architecture
//!
//! - [`ToolHandler`] trait - Core abstraction for tool implementations
//! - [`ToolRegistry`] - Thread-safe mapping of names to handlers
//! - Individual handlers in the [`handlers`] module
//!
//! Input is validated against each tool's declared schema at dispatch time
//! (see [`crate::validate`]); handlers then deserialize into typed argument
//! structs with [`parse_arguments`].

pub mod handlers;
pub mod registry;

pub use registry::{ToolHandler, ToolOutput, ToolRegistry};

use crate::error::ToolError;
use serde::Deserialize;

/// Parse JSON arguments into a typed struct.
///
/// This is a helper function for tool handlers to deserialize their input.
pub fn parse_arguments<T>(arguments: &serde_json::Value) -> Result<T, ToolError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(arguments.clone())
        .map_err(|err| ToolError::InvalidInput(format!("Failed to parse arguments: {err}")))
}

/// Telemetry preview limit for log output.
pub const TELEMETRY_PREVIEW_MAX_BYTES: usize = 2 * 1024; // 2 KiB

/// Default timeout for command execution in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000; // 30 seconds

/// Default timeout for HTTP fetches in milliseconds.
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Maximum HTTP response body size in bytes.
pub const FETCH_MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10 MiB

/// Maximum redirects followed by the fetch tool.
pub const FETCH_MAX_REDIRECTS: usize = 3;

/// Maximum invocations in a single batch.
pub const BATCH_MAX_INVOCATIONS: usize = 20;

/// Truncate text to a maximum byte length, respecting UTF-8 boundaries.
pub fn truncate_text(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }

    // Find the last valid char boundary within max_bytes
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    if end == 0 {
        return String::new();
    }

    format!("{}... [truncated]", &text[..end])
}
