// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Planning decorator.
//!
//! Wraps the engine and owns per-session plan-mode state. While a session
//! is in plan mode, mutating tools are substituted with a message directing
//! the model to write its plan to `.agent/plans/<session_id>.md`; read-only
//! tools and edits to that plan file pass through unchanged.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::context::Context;
use crate::engine::Engine;
use crate::error::ToolError;
use crate::tools::parse_arguments;
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Relative directory plan files live in, under the working root.
pub const PLANS_DIR: &str = ".agent/plans";

/// Tools that never mutate and stay available in plan mode.
const READ_ONLY_TOOLS: [&str; 2] = ["read_file", "list_files"];

/// Confirmation callback for entering plan mode: `(reason) -> bool`.
pub type PlanConfirmFn = dyn Fn(&str) -> bool + Send + Sync;

/// Decorator that enforces plan mode around an [`Engine`].
pub struct PlanningEngine {
    engine: Arc<Engine>,
    modes: RwLock<HashMap<String, bool>>,
    confirm: Option<Arc<PlanConfirmFn>>,
}

/// Arguments for the enter_plan_mode tool.
#[derive(Debug, Deserialize)]
struct EnterPlanModeArgs {
    reason: String,
}

impl PlanningEngine {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            modes: RwLock::new(HashMap::new()),
            confirm: None,
        }
    }

    /// Set a confirmation callback consulted before plan mode is enabled.
    pub fn with_confirm(mut self, confirm: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.confirm = Some(Arc::new(confirm));
        self
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Whether a session is in plan mode. Absent sessions are not.
    pub fn plan_mode(&self, session_id: &str) -> bool {
        let modes = self.modes.read().expect("plan mode lock poisoned");
        modes.get(session_id).copied().unwrap_or(false)
    }

    /// Enable or disable plan mode for a session. Enabling also ensures
    /// the on-disk plans directory exists.
    pub fn set_plan_mode(&self, session_id: &str, enabled: bool) -> Result<(), ToolError> {
        if enabled {
            self.ensure_plans_dir()?;
        }
        let mut modes = self.modes.write().expect("plan mode lock poisoned");
        modes.insert(session_id.to_string(), enabled);

        #[cfg(feature = "telemetry")]
        debug!(session = %session_id, enabled, "Plan mode changed");

        Ok(())
    }

    /// Engine definitions plus the decorator's own `enter_plan_mode` tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions = self.engine.definitions();
        definitions.push(enter_plan_mode_definition());
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool call under plan-mode rules.
    pub async fn execute(
        &self,
        ctx: &Context,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<String, ToolError> {
        if tool_name == "enter_plan_mode" {
            return self.enter_plan_mode(ctx, input);
        }

        let Some(session_id) = ctx.session_id() else {
            return self.engine.execute(ctx, tool_name, input).await;
        };
        if !self.plan_mode(session_id) {
            return self.engine.execute(ctx, tool_name, input).await;
        }

        if READ_ONLY_TOOLS.contains(&tool_name) {
            return self.engine.execute(ctx, tool_name, input).await;
        }

        if tool_name == "edit_file" && is_plan_file_edit(&input) {
            return self.engine.execute(ctx, tool_name, input).await;
        }

        #[cfg(feature = "telemetry")]
        debug!(session = %session_id, tool = %tool_name, "Tool blocked by plan mode");

        // A synthetic success: the model consumes the guidance and adapts
        Ok(format!(
            "[PLAN MODE] Tool '{tool_name}' is blocked in plan mode. Write your planned \
             changes to {PLANS_DIR}/{session_id}.md instead using edit_file."
        ))
    }

    fn enter_plan_mode(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<String, ToolError> {
        let args: EnterPlanModeArgs = parse_arguments(&input)?;

        if let Some(confirm) = &self.confirm {
            if !confirm(&args.reason) {
                return Ok("Plan mode request denied by user".to_string());
            }
        }

        let Some(session_id) = ctx.session_id() else {
            return Err(ToolError::InvalidInput(
                "enter_plan_mode requires a session id in the context".to_string(),
            ));
        };

        self.set_plan_mode(session_id, true)?;

        Ok(format!(
            "Plan mode enabled for session {session_id}. Read-only tools remain available; \
             write your plan to {PLANS_DIR}/{session_id}.md using edit_file. All other \
             tools are blocked until plan mode is disabled for this session."
        ))
    }

    fn ensure_plans_dir(&self) -> Result<PathBuf, ToolError> {
        let dir = self.engine.root().join(".agent").join("plans");

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o750)
                .create(&dir)
                .or_else(|e| {
                    if e.kind() == std::io::ErrorKind::AlreadyExists {
                        Ok(())
                    } else {
                        Err(e)
                    }
                })
                .map_err(|e| {
                    ToolError::IoError(format!("failed to create {}: {e}", dir.display()))
                })?;
        }

        #[cfg(not(unix))]
        std::fs::create_dir_all(&dir).map_err(|e| {
            ToolError::IoError(format!("failed to create {}: {e}", dir.display()))
        })?;

        Ok(dir)
    }
}

fn enter_plan_mode_definition() -> ToolDefinition {
    ToolDefinition::new(
        "enter_plan_mode",
        "Switch this session into plan mode: mutating tools are blocked and the plan is written to a markdown file",
    )
    .with_schema(
        InputSchema::new()
            .with_property("reason", PropertySchema::string("Why plan mode is needed"))
            .with_required(&["reason"]),
    )
}

fn is_plan_file_edit(input: &serde_json::Value) -> bool {
    input
        .get("path")
        .and_then(|v| v.as_str())
        .map(|path| path.contains(".agent/plans/") && path.ends_with(".md"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use tempfile::tempdir;

    fn planning(temp: &tempfile::TempDir) -> PlanningEngine {
        let engine = Engine::new(EngineConfig::new(temp.path())).unwrap();
        PlanningEngine::new(engine)
    }

    fn session_ctx(id: &str) -> Context {
        Context::background().with_session_id(id)
    }

    #[tokio::test]
    async fn test_plan_mode_blocks_mutating_tool() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let result = planning
            .execute(
                &session_ctx("s1"),
                "edit_file",
                serde_json::json!({"path": "foo.txt", "old_str": "", "new_str": "x"}),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            "[PLAN MODE] Tool 'edit_file' is blocked in plan mode. Write your planned \
             changes to .agent/plans/s1.md instead using edit_file."
        );
        assert!(!temp.path().join("foo.txt").exists());
    }

    #[tokio::test]
    async fn test_plan_mode_allows_read_only() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("foo.txt"), "data\n").unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let result = planning
            .execute(
                &session_ctx("s1"),
                "read_file",
                serde_json::json!({"path": "foo.txt"}),
            )
            .await
            .unwrap();
        assert_eq!(result, "1: data\n");

        let listing = planning
            .execute(&session_ctx("s1"), "list_files", serde_json::json!({}))
            .await
            .unwrap();
        assert!(listing.contains("foo.txt"));
    }

    #[tokio::test]
    async fn test_plan_mode_allows_plan_file_edit() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let result = planning
            .execute(
                &session_ctx("s1"),
                "edit_file",
                serde_json::json!({"path": ".agent/plans/s1.md", "old_str": "", "new_str": "# plan"}),
            )
            .await
            .unwrap();

        assert!(result.contains("Created file"));
        assert_eq!(
            std::fs::read_to_string(temp.path().join(".agent/plans/s1.md")).unwrap(),
            "# plan"
        );
    }

    #[tokio::test]
    async fn test_plan_mode_rejects_non_markdown_plan_path() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let result = planning
            .execute(
                &session_ctx("s1"),
                "edit_file",
                serde_json::json!({"path": ".agent/plans/s1.sh", "old_str": "", "new_str": "x"}),
            )
            .await
            .unwrap();
        assert!(result.starts_with("[PLAN MODE]"));
    }

    #[tokio::test]
    async fn test_no_session_passes_through() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        // A context with no session id is never in plan mode
        let result = planning
            .execute(
                &Context::background(),
                "edit_file",
                serde_json::json!({"path": "free.txt", "old_str": "", "new_str": "x"}),
            )
            .await
            .unwrap();
        assert!(result.contains("Created file"));
    }

    #[tokio::test]
    async fn test_other_session_unaffected() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let result = planning
            .execute(
                &session_ctx("s2"),
                "edit_file",
                serde_json::json!({"path": "other.txt", "old_str": "", "new_str": "x"}),
            )
            .await
            .unwrap();
        assert!(result.contains("Created file"));
    }

    #[tokio::test]
    async fn test_enter_plan_mode_tool() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);

        let result = planning
            .execute(
                &session_ctx("s1"),
                "enter_plan_mode",
                serde_json::json!({"reason": "large refactor"}),
            )
            .await
            .unwrap();

        assert!(result.contains("Plan mode enabled"));
        assert!(planning.plan_mode("s1"));
        assert!(temp.path().join(".agent/plans").is_dir());
    }

    #[tokio::test]
    async fn test_enter_plan_mode_denied() {
        let temp = tempdir().unwrap();
        let engine = Engine::new(EngineConfig::new(temp.path())).unwrap();
        let planning = PlanningEngine::new(engine).with_confirm(|_| false);

        let result = planning
            .execute(
                &session_ctx("s1"),
                "enter_plan_mode",
                serde_json::json!({"reason": "nope"}),
            )
            .await
            .unwrap();

        assert_eq!(result, "Plan mode request denied by user");
        assert!(!planning.plan_mode("s1"));
    }

    #[tokio::test]
    async fn test_enter_plan_mode_without_session() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);

        let err = planning
            .execute(
                &Context::background(),
                "enter_plan_mode",
                serde_json::json!({"reason": "r"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_plans_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        planning.set_plan_mode("s1", true).unwrap();

        let metadata = std::fs::metadata(temp.path().join(".agent/plans")).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o750);
    }

    #[test]
    fn test_definitions_include_enter_plan_mode() {
        let temp = tempdir().unwrap();
        let planning = planning(&temp);
        assert!(planning
            .definitions()
            .iter()
            .any(|d| d.name == "enter_plan_mode"));
    }
}
