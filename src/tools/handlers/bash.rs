// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bash tool handler.
//!
//! Executes shell commands under the shell policy, with a deadline bounded
//! by the caller's context. The subprocess is killed when the deadline
//! expires or the context is cancelled. A nonzero exit code is not a tool
//! error; the result JSON carries it.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument, warn};

use crate::context::Context;
use crate::error::ToolError;
use crate::safety::ShellPolicy;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::tools::{parse_arguments, DEFAULT_TIMEOUT_MS};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Handler for the `bash` tool.
pub struct BashHandler {
    cwd: PathBuf,
    policy: Arc<RwLock<Arc<ShellPolicy>>>,
}

impl BashHandler {
    pub fn new(cwd: PathBuf, policy: Arc<RwLock<Arc<ShellPolicy>>>) -> Self {
        Self { cwd, policy }
    }
}

/// Arguments for the bash tool.
#[derive(Debug, Deserialize)]
struct BashArgs {
    /// The command to execute.
    command: String,

    /// Optional description of what the command does.
    #[serde(default)]
    description: Option<String>,

    /// Timeout in milliseconds (default: 30000).
    #[serde(default)]
    timeout_ms: Option<u64>,

    /// The model's own danger marking; unioned with the classifier.
    #[serde(default)]
    dangerous: bool,
}

#[async_trait]
impl ToolHandler for BashHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "bash",
            "Execute a shell command and return its stdout, stderr, and exit code as JSON",
        )
        .with_schema(
            InputSchema::new()
                .with_property("command", PropertySchema::string("The shell command to execute"))
                .with_property(
                    "description",
                    PropertySchema::string("Short description of what the command does"),
                )
                .with_property(
                    "timeout_ms",
                    PropertySchema::integer("Timeout in milliseconds (default: 30000)")
                        .with_minimum(1.0),
                )
                .with_property(
                    "dangerous",
                    PropertySchema::boolean("Set true if this command could be destructive"),
                )
                .with_required(&["command"]),
        )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, ctx, input), fields(command, exit_code)))]
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: BashArgs = parse_arguments(&input)?;

        if args.command.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "command must not be empty".to_string(),
            ));
        }

        #[cfg(feature = "telemetry")]
        {
            let preview = crate::tools::truncate_text(&args.command, 100);
            tracing::Span::current().record("command", preview.as_str());
        }

        // Stable policy snapshot for this invocation
        let policy = {
            let guard = self.policy.read().expect("policy lock poisoned");
            Arc::clone(&guard)
        };
        policy.authorize(
            &args.command,
            args.description.as_deref().unwrap_or(""),
            args.dangerous,
        )?;

        ctx.check()?;

        // Never extend a tighter parent deadline
        let requested = Duration::from_millis(args.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));
        let timeout = ctx.bounded_timeout(requested);

        let mut command = Command::new("bash");
        command
            .arg("-c")
            .arg(&args.command)
            .current_dir(&self.cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::select! {
            result = tokio::time::timeout(timeout, command.output()) => match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Err(ToolError::ExecutionFailed(format!(
                        "failed to execute command: {e}"
                    )));
                }
                Err(_) => {
                    #[cfg(feature = "telemetry")]
                    warn!(timeout_ms = timeout.as_millis() as u64, "Command timed out");
                    // kill_on_drop reaps the subprocess
                    return Err(ToolError::Timeout(timeout.as_millis() as u64));
                }
            },
            _ = ctx.cancellation_token().cancelled() => {
                return Err(ToolError::Cancelled("command cancelled".to_string()));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);

        #[cfg(feature = "telemetry")]
        {
            tracing::Span::current().record("exit_code", exit_code);
            debug!(exit_code, "Command executed");
        }

        let result = serde_json::json!({
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "exit_code": exit_code,
        });

        Ok(ToolOutput {
            content: result.to_string(),
            success: exit_code == 0,
        })
    }
}
