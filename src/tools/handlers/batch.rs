// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Batch combinator tool handler.
//!
//! Executes a bounded list of inner tool invocations, sequentially (with
//! optional stop-on-error) or in parallel with index-stable results. The
//! handler re-enters the engine for each inner invocation; nested batches
//! are rejected per invocation so a batch cannot contain a batch.

use std::sync::Weak;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::engine::Engine;
use crate::error::ToolError;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::tools::{parse_arguments, BATCH_MAX_INVOCATIONS};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Handler for the `batch_tool` tool.
pub struct BatchToolHandler {
    engine: Weak<Engine>,
}

impl BatchToolHandler {
    pub fn new(engine: Weak<Engine>) -> Self {
        Self { engine }
    }
}

/// One inner invocation of a batch.
#[derive(Debug, Clone, Deserialize)]
struct BatchInvocation {
    tool_name: String,
    arguments: serde_json::Value,
}

/// Arguments for the batch_tool tool.
#[derive(Debug, Deserialize)]
struct BatchArgs {
    invocations: Vec<BatchInvocation>,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    stop_on_error: bool,
}

/// Per-invocation result slot.
#[derive(Debug, Clone, Serialize)]
struct BatchEntry {
    index: usize,
    tool_name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct BatchReport {
    total: usize,
    success_count: usize,
    failed_count: usize,
    results: Vec<BatchEntry>,
    stopped_early: bool,
}

#[async_trait]
impl ToolHandler for BatchToolHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "batch_tool",
            "Execute up to 20 tool invocations together, sequentially or in parallel",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "invocations",
                    PropertySchema::array(
                        "object",
                        "Invocations to run, each {tool_name, arguments}",
                    ),
                )
                .with_property(
                    "parallel",
                    PropertySchema::boolean("Run all invocations concurrently (default: false)"),
                )
                .with_property(
                    "stop_on_error",
                    PropertySchema::boolean(
                        "Stop a sequential batch at the first failure (default: false; ignored in parallel mode)",
                    ),
                )
                .with_required(&["invocations"]),
        )
    }

    fn is_mutating(&self) -> bool {
        // Inner invocations may mutate
        true
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, ctx, input), fields(total, parallel)))]
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: BatchArgs = parse_arguments(&input)?;

        if args.invocations.is_empty() {
            return Err(ToolError::InvalidInput(
                "invocations must not be empty".to_string(),
            ));
        }
        if args.invocations.len() > BATCH_MAX_INVOCATIONS {
            return Err(ToolError::InvalidInput(format!(
                "too many invocations: {} (limit {BATCH_MAX_INVOCATIONS})",
                args.invocations.len()
            )));
        }
        for (i, invocation) in args.invocations.iter().enumerate() {
            if invocation.tool_name.trim().is_empty() {
                return Err(ToolError::InvalidInput(format!(
                    "invocations[{i}] is missing tool_name"
                )));
            }
        }

        let engine = self
            .engine
            .upgrade()
            .ok_or_else(|| ToolError::NotAvailable("engine has shut down".to_string()))?;

        #[cfg(feature = "telemetry")]
        {
            let span = tracing::Span::current();
            span.record("total", args.invocations.len());
            span.record("parallel", args.parallel);
        }

        let report = if args.parallel {
            run_parallel(&engine, ctx, args.invocations).await?
        } else {
            run_sequential(&engine, ctx, args.invocations, args.stop_on_error).await?
        };

        #[cfg(feature = "telemetry")]
        debug!(
            success = report.success_count,
            failed = report.failed_count,
            stopped_early = report.stopped_early,
            "Batch finished"
        );

        let json = serde_json::to_string(&report)
            .map_err(|e| ToolError::IoError(format!("failed to encode batch report: {e}")))?;
        Ok(ToolOutput::success(json))
    }
}

async fn run_one(
    engine: &Engine,
    ctx: &Context,
    index: usize,
    invocation: BatchInvocation,
) -> BatchEntry {
    let start = Instant::now();

    let outcome = if invocation.tool_name == "batch_tool" {
        Err(ToolError::InvalidInput(
            "nested batch_tool invocations are not supported".to_string(),
        ))
    } else {
        engine
            .execute(ctx, &invocation.tool_name, invocation.arguments.clone())
            .await
    };

    // Sub-millisecond executions round up to 1
    let duration_ms = (start.elapsed().as_millis() as u64).max(1);

    match outcome {
        Ok(result) => BatchEntry {
            index,
            tool_name: invocation.tool_name,
            success: true,
            result: Some(result),
            error: None,
            duration_ms,
        },
        Err(err) => BatchEntry {
            index,
            tool_name: invocation.tool_name,
            success: false,
            result: None,
            error: Some(err.to_string()),
            duration_ms,
        },
    }
}

async fn run_sequential(
    engine: &Engine,
    ctx: &Context,
    invocations: Vec<BatchInvocation>,
    stop_on_error: bool,
) -> Result<BatchReport, ToolError> {
    let total = invocations.len();
    let mut results: Vec<BatchEntry> = Vec::with_capacity(total);
    let mut stopped_early = false;

    for (index, invocation) in invocations.into_iter().enumerate() {
        ctx.check()?;

        let entry = run_one(engine, ctx, index, invocation).await;
        let failed = !entry.success;
        results.push(entry);

        if failed && stop_on_error {
            stopped_early = true;
            break;
        }
    }

    Ok(report_from(total, results, stopped_early))
}

async fn run_parallel(
    engine: &std::sync::Arc<Engine>,
    ctx: &Context,
    invocations: Vec<BatchInvocation>,
) -> Result<BatchReport, ToolError> {
    let total = invocations.len();

    // Each worker carries its own context derived from the batch's, and
    // writes an index-stable slot; joining in spawn order preserves index
    // ordering regardless of completion order.
    let handles: Vec<tokio::task::JoinHandle<BatchEntry>> = invocations
        .into_iter()
        .enumerate()
        .map(|(index, invocation)| {
            let engine = std::sync::Arc::clone(engine);
            let worker_ctx = ctx.child();
            tokio::spawn(async move { run_one(&engine, &worker_ctx, index, invocation).await })
        })
        .collect();

    let mut results: Vec<BatchEntry> = Vec::with_capacity(total);
    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(entry) => results.push(entry),
            Err(e) => results.push(BatchEntry {
                index,
                tool_name: String::new(),
                success: false,
                result: None,
                error: Some(format!("worker panicked: {e}")),
                duration_ms: 1,
            }),
        }
    }

    // A cancellation surfaces only after all workers have joined
    if ctx.is_cancelled() {
        return Err(ToolError::Cancelled(
            "batch cancelled while executing".to_string(),
        ));
    }

    Ok(report_from(total, results, false))
}

fn report_from(total: usize, results: Vec<BatchEntry>, stopped_early: bool) -> BatchReport {
    let success_count = results.iter().filter(|r| r.success).count();
    let failed_count = results.iter().filter(|r| !r.success).count();
    BatchReport {
        total,
        success_count,
        failed_count,
        results,
        stopped_early,
    }
}
