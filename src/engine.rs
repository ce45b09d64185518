// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The tool execution engine.
//!
//! The engine is the central mediator between a language-model client and
//! the local host. It owns the tool registry, the shell policy, the
//! investigation store, and the optional skill/subagent collaborators.
//! Every execution runs `check context -> resolve tool -> validate input ->
//! dispatch handler`.
//!
//! There is no process-wide singleton; everything hangs off the engine
//! instance passed explicitly.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[cfg(feature = "telemetry")]
use std::time::Instant;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::context::Context;
use crate::error::ToolError;
use crate::fs::{FileManager, LocalFileManager};
use crate::investigation::InvestigationStore;
use crate::safety::ShellPolicy;
use crate::skills::SkillManager;
use crate::subagent::SubagentUseCase;
use crate::tools::handlers::{
    ActivateSkillHandler, BashHandler, BatchToolHandler, CompleteInvestigationHandler,
    DelegateHandler, EditFileHandler, EscalateInvestigationHandler, FetchHandler,
    ListFilesHandler, ReadFileHandler, ReportInvestigationHandler, TaskHandler,
};
use crate::tools::registry::ToolRegistry;
use crate::types::ToolDefinition;
use crate::validate::{parse_raw, validate_input};

/// Construction-time options for the engine.
pub struct EngineConfig {
    root: PathBuf,
    policy: ShellPolicy,
    fs: Option<Arc<dyn FileManager>>,
}

impl EngineConfig {
    /// Configure an engine rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            policy: ShellPolicy::blacklist(),
            fs: None,
        }
    }

    /// Set the shell policy.
    pub fn with_policy(mut self, policy: ShellPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Substitute the filesystem collaborator.
    pub fn with_file_manager(mut self, fs: Arc<dyn FileManager>) -> Self {
        self.fs = Some(fs);
        self
    }
}

/// The tool execution engine.
pub struct Engine {
    root: PathBuf,
    fs: Arc<dyn FileManager>,
    registry: ToolRegistry,
    policy: Arc<RwLock<Arc<ShellPolicy>>>,
    investigations: Arc<InvestigationStore>,
    skills: Arc<RwLock<Option<Arc<dyn SkillManager>>>>,
    subagents: Arc<RwLock<Option<Arc<dyn SubagentUseCase>>>>,
}

impl Engine {
    /// Build an engine with the built-in tools registered.
    pub fn new(config: EngineConfig) -> Result<Arc<Self>, ToolError> {
        let root = config.root.canonicalize().map_err(|e| {
            ToolError::InvalidInput(format!(
                "working root {} is not usable: {e}",
                config.root.display()
            ))
        })?;

        let engine = Arc::new(Self {
            root,
            fs: config.fs.unwrap_or_else(|| Arc::new(LocalFileManager)),
            registry: ToolRegistry::new(),
            policy: Arc::new(RwLock::new(Arc::new(config.policy))),
            investigations: Arc::new(InvestigationStore::new()),
            skills: Arc::new(RwLock::new(None)),
            subagents: Arc::new(RwLock::new(None)),
        });
        engine.register_builtins()?;
        Ok(engine)
    }

    fn register_builtins(self: &Arc<Self>) -> Result<(), ToolError> {
        let registry = &self.registry;

        registry.register(Arc::new(ReadFileHandler::new(
            self.root.clone(),
            Arc::clone(&self.fs),
        )))?;
        registry.register(Arc::new(ListFilesHandler::new(
            self.root.clone(),
            Arc::clone(&self.fs),
        )))?;
        registry.register(Arc::new(EditFileHandler::new(
            self.root.clone(),
            Arc::clone(&self.fs),
        )))?;
        registry.register(Arc::new(BashHandler::new(
            self.root.clone(),
            Arc::clone(&self.policy),
        )))?;
        registry.register(Arc::new(FetchHandler::new()?))?;
        registry.register(Arc::new(CompleteInvestigationHandler::new(Arc::clone(
            &self.investigations,
        ))))?;
        registry.register(Arc::new(EscalateInvestigationHandler::new(Arc::clone(
            &self.investigations,
        ))))?;
        registry.register(Arc::new(ReportInvestigationHandler::new(Arc::clone(
            &self.investigations,
        ))))?;
        registry.register(Arc::new(ActivateSkillHandler::new(
            Arc::clone(&self.skills),
            ActivateSkillHandler::describe(&Default::default()),
        )))?;
        registry.register(Arc::new(TaskHandler::new(
            Arc::clone(&self.subagents),
            TaskHandler::describe(&[]),
        )))?;
        registry.register(Arc::new(DelegateHandler::new(Arc::clone(&self.subagents))))?;
        registry.register(Arc::new(BatchToolHandler::new(Arc::downgrade(self))))?;

        Ok(())
    }

    /// The working root all filesystem operations stay under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Snapshot of all tool definitions, for the model-client boundary.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// The investigation store.
    pub fn investigations(&self) -> &Arc<InvestigationStore> {
        &self.investigations
    }

    /// Register an investigation under a caller-supplied id.
    pub fn register_investigation(&self, id: &str) -> Result<(), ToolError> {
        self.investigations.register(id)
    }

    /// Replace the shell policy atomically. In-flight invocations keep the
    /// snapshot they took at dispatch time.
    pub fn set_policy(&self, policy: ShellPolicy) {
        let mut guard = self.policy.write().expect("policy lock poisoned");
        *guard = Arc::new(policy);
    }

    /// Set (or replace) the skill manager and rebuild the `activate_skill`
    /// description so the model sees the current skill list.
    pub async fn set_skill_manager(
        &self,
        manager: Arc<dyn SkillManager>,
    ) -> Result<(), ToolError> {
        {
            let mut guard = self.skills.write().expect("skill manager lock poisoned");
            *guard = Some(Arc::clone(&manager));
        }

        let list = manager.discover().await?;
        self.registry.register(Arc::new(ActivateSkillHandler::new(
            Arc::clone(&self.skills),
            ActivateSkillHandler::describe(&list),
        )))
    }

    /// Set (or replace) the subagent use case and rebuild the `task`
    /// description with the currently discovered agents.
    pub async fn set_subagent_use_case(
        &self,
        use_case: Arc<dyn SubagentUseCase>,
    ) -> Result<(), ToolError> {
        {
            let mut guard = self.subagents.write().expect("subagent lock poisoned");
            *guard = Some(Arc::clone(&use_case));
        }

        let agents = use_case.list_agents().await;
        self.registry.register(Arc::new(TaskHandler::new(
            Arc::clone(&self.subagents),
            TaskHandler::describe(&agents),
        )))
    }

    /// Execute a tool call: check the context, resolve the tool, validate
    /// the input against its declared schema, and dispatch.
    ///
    /// Errors propagate verbatim; the engine does not retry.
    pub async fn execute(
        &self,
        ctx: &Context,
        tool_name: &str,
        input: serde_json::Value,
    ) -> Result<String, ToolError> {
        ctx.check()?;

        let (definition, handler) = self
            .registry
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        validate_input(&definition, &input)?;

        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let result = handler.execute(ctx, input).await;

        #[cfg(feature = "telemetry")]
        match &result {
            Ok(output) => debug!(
                tool = %tool_name,
                duration_ms = start.elapsed().as_millis() as u64,
                preview = %output.log_preview(crate::tools::TELEMETRY_PREVIEW_MAX_BYTES),
                "Tool execution succeeded"
            ),
            Err(err) => debug!(
                tool = %tool_name,
                duration_ms = start.elapsed().as_millis() as u64,
                error = %err,
                "Tool execution failed"
            ),
        }

        result.map(|output| output.content)
    }

    /// Execute a tool call with raw JSON input.
    pub async fn execute_raw(
        &self,
        ctx: &Context,
        tool_name: &str,
        raw_input: &str,
    ) -> Result<String, ToolError> {
        let input = parse_raw(raw_input)?;
        self.execute(ctx, tool_name, input).await
    }
}
