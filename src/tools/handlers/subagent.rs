// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subagent spawning tool handlers.
//!
//! `task` spawns a pre-configured agent by name; `delegate` spawns a
//! dynamically specified one. Both refuse to run from a context that
//! already carries the subagent marker, so a subagent cannot spawn
//! further subagents.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::ToolError;
use crate::subagent::{AgentInfo, SubagentResult, SubagentSpec, SubagentUseCase};
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

type SharedUseCase = Arc<RwLock<Option<Arc<dyn SubagentUseCase>>>>;

fn resolve_use_case(shared: &SharedUseCase) -> Result<Arc<dyn SubagentUseCase>, ToolError> {
    let guard = shared.read().expect("subagent lock poisoned");
    guard
        .clone()
        .ok_or_else(|| ToolError::NotAvailable("no subagent use case configured".to_string()))
}

fn reject_recursion(ctx: &Context) -> Result<(), ToolError> {
    if ctx.is_subagent() {
        return Err(ToolError::Terminal(
            "subagent recursion is not allowed: a subagent cannot spawn subagents".to_string(),
        ));
    }
    Ok(())
}

fn render_result(result: &SubagentResult) -> String {
    let mut doc = serde_json::json!({
        "subagent_id": result.subagent_id,
        "agent_name": result.agent_name,
        "status": result.status,
        "output": result.output,
        "actions_taken": result.actions_taken,
        "duration_ms": result.duration.as_millis() as u64,
    });
    if let Some(error) = &result.error {
        doc["error"] = serde_json::Value::String(error.clone());
    }
    doc.to_string()
}

/// Handler for the `task` tool: spawn a pre-configured agent by name.
pub struct TaskHandler {
    use_case: SharedUseCase,
    description: String,
}

impl TaskHandler {
    pub fn new(use_case: SharedUseCase, description: String) -> Self {
        Self {
            use_case,
            description,
        }
    }

    /// Build the user-visible description from the discovered agent list.
    pub fn describe(agents: &[AgentInfo]) -> String {
        if agents.is_empty() {
            return "Spawn a pre-configured subagent by name. No agents are currently available."
                .to_string();
        }
        let names: Vec<String> = agents
            .iter()
            .map(|a| format!("{} ({})", a.name, a.description))
            .collect();
        format!(
            "Spawn a pre-configured subagent by name. Available agents: {}",
            names.join(", ")
        )
    }
}

/// Arguments for the task tool.
#[derive(Debug, Deserialize)]
struct TaskArgs {
    agent_name: String,
    prompt: String,
}

#[async_trait]
impl ToolHandler for TaskHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("task", &self.description).with_schema(
            InputSchema::new()
                .with_property(
                    "agent_name",
                    PropertySchema::string("Name of the pre-configured agent to spawn"),
                )
                .with_property("prompt", PropertySchema::string("Task prompt for the agent"))
                .with_required(&["agent_name", "prompt"]),
        )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, ctx, input), fields(agent)))]
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: TaskArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("agent", args.agent_name.as_str());

        reject_recursion(ctx)?;
        let use_case = resolve_use_case(&self.use_case)?;

        // The context passes through so thinking-mode hints reach the
        // subagent runtime verbatim
        let result = use_case.spawn(ctx, &args.agent_name, &args.prompt).await?;

        #[cfg(feature = "telemetry")]
        debug!(agent = %result.agent_name, status = %result.status, "Subagent finished");

        Ok(ToolOutput::success(render_result(&result)))
    }
}

/// Handler for the `delegate` tool: spawn a dynamically specified agent.
pub struct DelegateHandler {
    use_case: SharedUseCase,
}

impl DelegateHandler {
    pub fn new(use_case: SharedUseCase) -> Self {
        Self { use_case }
    }
}

/// Arguments for the delegate tool.
#[derive(Debug, Deserialize)]
struct DelegateArgs {
    name: String,
    system_prompt: String,
    task: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_actions: Option<u32>,
    #[serde(default)]
    allowed_tools: Option<Vec<String>>,
}

#[async_trait]
impl ToolHandler for DelegateHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "delegate",
            "Spawn a dynamically specified subagent with its own system prompt and tool allow-list",
        )
        .with_schema(
            InputSchema::new()
                .with_property("name", PropertySchema::string("Name for the new agent"))
                .with_property(
                    "system_prompt",
                    PropertySchema::string("System prompt for the agent"),
                )
                .with_property("task", PropertySchema::string("Task prompt for the agent"))
                .with_property("model", PropertySchema::string("Optional model override"))
                .with_property(
                    "max_actions",
                    PropertySchema::integer("Maximum actions before the agent stops")
                        .with_minimum(1.0),
                )
                .with_property(
                    "allowed_tools",
                    PropertySchema::array("string", "Tools the agent may use"),
                )
                .with_required(&["name", "system_prompt", "task"]),
        )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, ctx, input), fields(agent)))]
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: DelegateArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("agent", args.name.as_str());

        reject_recursion(ctx)?;
        let use_case = resolve_use_case(&self.use_case)?;

        let spec = SubagentSpec {
            name: args.name,
            system_prompt: args.system_prompt,
            model: args.model,
            max_actions: args.max_actions,
            allowed_tools: args.allowed_tools,
        };
        let result = use_case.spawn_dynamic(ctx, spec, &args.task).await?;

        #[cfg(feature = "telemetry")]
        debug!(agent = %result.agent_name, status = %result.status, "Subagent finished");

        Ok(ToolOutput::success(render_result(&result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ThinkingMode;
    use std::time::Duration;

    struct FakeUseCase;

    #[async_trait]
    impl SubagentUseCase for FakeUseCase {
        async fn spawn(
            &self,
            ctx: &Context,
            agent_name: &str,
            _prompt: &str,
        ) -> Result<SubagentResult, ToolError> {
            // Thinking hints arrive untouched
            let thinking = ctx.thinking_mode().map(|t| t.budget_tokens).unwrap_or(0);
            Ok(SubagentResult {
                subagent_id: "sub-1".to_string(),
                agent_name: agent_name.to_string(),
                status: "completed".to_string(),
                output: format!("done (thinking budget {thinking})"),
                actions_taken: 3,
                duration: Duration::from_millis(1500),
                error: None,
            })
        }

        async fn spawn_dynamic(
            &self,
            _ctx: &Context,
            spec: SubagentSpec,
            _task: &str,
        ) -> Result<SubagentResult, ToolError> {
            Ok(SubagentResult {
                subagent_id: "sub-2".to_string(),
                agent_name: spec.name,
                status: "completed".to_string(),
                output: "dynamic done".to_string(),
                actions_taken: 1,
                duration: Duration::from_millis(10),
                error: None,
            })
        }

        async fn list_agents(&self) -> Vec<AgentInfo> {
            vec![AgentInfo {
                name: "researcher".to_string(),
                description: "Investigates questions".to_string(),
            }]
        }
    }

    fn shared() -> SharedUseCase {
        Arc::new(RwLock::new(Some(
            Arc::new(FakeUseCase) as Arc<dyn SubagentUseCase>
        )))
    }

    #[tokio::test]
    async fn test_task_spawns() {
        let handler = TaskHandler::new(shared(), "Spawn".to_string());
        let result = handler
            .execute(
                &Context::background(),
                serde_json::json!({"agent_name": "researcher", "prompt": "look into it"}),
            )
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(result.content()).unwrap();
        assert_eq!(parsed["subagent_id"], "sub-1");
        assert_eq!(parsed["agent_name"], "researcher");
        assert_eq!(parsed["actions_taken"], 3);
        assert_eq!(parsed["duration_ms"], 1500);
        assert!(parsed.get("error").is_none());
    }

    #[tokio::test]
    async fn test_task_rejects_subagent_context() {
        let handler = TaskHandler::new(shared(), "Spawn".to_string());
        let ctx = Context::background().with_subagent_marker();

        let err = handler
            .execute(
                &ctx,
                serde_json::json!({"agent_name": "researcher", "prompt": "x"}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("recursion"));
    }

    #[tokio::test]
    async fn test_task_without_use_case() {
        let handler = TaskHandler::new(Arc::new(RwLock::new(None)), "Spawn".to_string());
        let err = handler
            .execute(
                &Context::background(),
                serde_json::json!({"agent_name": "a", "prompt": "x"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_task_passes_thinking_hints() {
        let handler = TaskHandler::new(shared(), "Spawn".to_string());
        let ctx = Context::background().with_thinking_mode(ThinkingMode {
            enabled: true,
            budget_tokens: 2048,
            show: true,
        });

        let result = handler
            .execute(
                &ctx,
                serde_json::json!({"agent_name": "researcher", "prompt": "x"}),
            )
            .await
            .unwrap();

        assert!(result.content().contains("thinking budget 2048"));
    }

    #[tokio::test]
    async fn test_delegate_spawns_dynamic() {
        let handler = DelegateHandler::new(shared());
        let result = handler
            .execute(
                &Context::background(),
                serde_json::json!({
                    "name": "fixer",
                    "system_prompt": "You fix bugs.",
                    "task": "fix the bug",
                    "max_actions": 5
                }),
            )
            .await
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(result.content()).unwrap();
        assert_eq!(parsed["agent_name"], "fixer");
        assert_eq!(parsed["status"], "completed");
    }

    #[tokio::test]
    async fn test_delegate_rejects_subagent_context() {
        let handler = DelegateHandler::new(shared());
        let ctx = Context::background().with_subagent_marker();

        let err = handler
            .execute(
                &ctx,
                serde_json::json!({"name": "a", "system_prompt": "b", "task": "c"}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("recursion"));
    }

    #[test]
    fn test_describe_lists_agents() {
        let agents = vec![AgentInfo {
            name: "researcher".to_string(),
            description: "Investigates questions".to_string(),
        }];
        let description = TaskHandler::describe(&agents);
        assert!(description.contains("researcher (Investigates questions)"));

        assert!(TaskHandler::describe(&[]).contains("No agents"));
    }
}
