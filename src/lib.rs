// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cogent - tool execution engine for code-editing AI agents.
//!
//! Cogent is the central mediator between a language-model client and the
//! local host: a registry of named tools (file read/list/edit, shell, HTTP
//! fetch, skill activation, subagent spawning, investigation lifecycle, and
//! a batch combinator), schema-driven input validation, and a layered
//! safety policy applied before any privileged action.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Tool descriptors and input schemas
//! - [`error`] - Error taxonomy and result aliases
//! - [`context`] - Deadline, cancellation, and ambient request values
//! - [`validate`] - Schema-driven input validation
//! - [`safety`] - Path traversal, SSRF, and shell command guards
//! - [`fs`] - Filesystem boundary
//! - [`tools`] - Tool handlers and the thread-safe registry
//! - [`investigation`] - Per-investigation state machine
//! - [`engine`] - The engine: wiring, dispatch, collaborator management
//! - [`plan`] - Planning decorator (per-session plan mode)
//! - [`signals`] - Reload and two-stage interrupt handling
//! - [`skills`] / [`subagent`] - External collaborator boundaries
//! - [`telemetry`] - Tracing initialization
//!
//! # Example
//!
//! ```rust,ignore
//! use cogent::engine::{Engine, EngineConfig};
//! use cogent::context::Context;
//!
//! let engine = Engine::new(EngineConfig::new("."))?;
//! let ctx = Context::background().with_session_id("s1");
//! let listing = engine.execute(&ctx, "list_files", serde_json::json!({})).await?;
//! ```
//!
//! The chat UI, CLI flag parsing, model client, and on-disk skill/subagent
//! discovery are external collaborators; the engine only defines their
//! boundaries.

pub mod context;
pub mod engine;
pub mod error;
pub mod fs;
pub mod investigation;
pub mod plan;
pub mod safety;
pub mod signals;
pub mod skills;
pub mod subagent;
pub mod telemetry;
pub mod tools;
pub mod types;
pub mod validate;

// Re-export commonly used types at crate root
pub use context::{Context, ThinkingMode};
pub use engine::{Engine, EngineConfig};
pub use error::{Result, ToolError};
pub use investigation::{InvestigationStatus, InvestigationStore};
pub use plan::PlanningEngine;
pub use safety::{PolicyMode, ShellPolicy, WhitelistPattern};
pub use tools::{ToolHandler, ToolOutput, ToolRegistry};
pub use types::{InputSchema, PropertySchema, ToolDefinition};

/// Cogent version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        // Verify key types are accessible
        let _ctx = Context::background();
        let _schema = InputSchema::new();
        let _policy = ShellPolicy::blacklist();
    }
}
