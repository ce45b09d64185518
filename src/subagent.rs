// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Subagent boundary.
//!
//! The engine does not run subagents itself; it spawns them through the
//! [`SubagentUseCase`] trait and reports the result. The caller's context
//! is passed through so thinking-mode hints reach the subagent runtime
//! verbatim.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ToolError;

/// A dynamically specified subagent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentSpec {
    pub name: String,
    pub system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_actions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
}

/// Outcome of a subagent run.
#[derive(Debug, Clone)]
pub struct SubagentResult {
    pub subagent_id: String,
    pub agent_name: String,
    pub status: String,
    pub output: String,
    pub actions_taken: u32,
    pub duration: Duration,
    pub error: Option<String>,
}

/// A discovered, pre-configured agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
}

/// Capability contract for spawning subagents.
#[async_trait]
pub trait SubagentUseCase: Send + Sync {
    /// Spawn a pre-configured agent by name.
    async fn spawn(
        &self,
        ctx: &Context,
        agent_name: &str,
        prompt: &str,
    ) -> Result<SubagentResult, ToolError>;

    /// Spawn a dynamically specified agent.
    async fn spawn_dynamic(
        &self,
        ctx: &Context,
        spec: SubagentSpec,
        task: &str,
    ) -> Result<SubagentResult, ToolError>;

    /// List the currently discovered agents (for tool descriptions).
    async fn list_agents(&self) -> Vec<AgentInfo>;
}
