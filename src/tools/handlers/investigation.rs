// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Investigation lifecycle tool handlers.
//!
//! `complete_investigation` and `escalate_investigation` perform the
//! at-most-once terminal transitions; `report_investigation` records
//! progress without changing state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::ToolError;
use crate::investigation::InvestigationStore;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Handler for the `complete_investigation` tool.
pub struct CompleteInvestigationHandler {
    store: Arc<InvestigationStore>,
}

impl CompleteInvestigationHandler {
    pub fn new(store: Arc<InvestigationStore>) -> Self {
        Self { store }
    }
}

/// Arguments for the complete_investigation tool.
#[derive(Debug, Deserialize)]
struct CompleteArgs {
    investigation_id: String,
    confidence: f64,
    findings: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    root_cause: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    recommended_actions: Option<Vec<String>>,
    #[serde(default)]
    #[allow(dead_code)]
    severity: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    summary: Option<String>,
}

#[async_trait]
impl ToolHandler for CompleteInvestigationHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "complete_investigation",
            "Mark an investigation as completed with findings and a confidence score",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "investigation_id",
                    PropertySchema::string("Id of the investigation to complete"),
                )
                .with_property(
                    "confidence",
                    PropertySchema::number("Confidence in the findings, 0 to 1")
                        .with_minimum(0.0)
                        .with_maximum(1.0),
                )
                .with_property(
                    "findings",
                    PropertySchema::array("string", "What the investigation found"),
                )
                .with_property("root_cause", PropertySchema::string("Identified root cause"))
                .with_property(
                    "recommended_actions",
                    PropertySchema::array("string", "Suggested follow-up actions"),
                )
                .with_property(
                    "severity",
                    PropertySchema::string("Severity of the findings")
                        .with_enum(&["info", "warning", "error", "critical"]),
                )
                .with_property("summary", PropertySchema::string("One-line summary"))
                .with_required(&["investigation_id", "confidence", "findings"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(investigation)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: CompleteArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("investigation", args.investigation_id.as_str());

        if !(0.0..=1.0).contains(&args.confidence) {
            return Err(ToolError::InvalidInput(format!(
                "confidence must be between 0 and 1, got {}",
                args.confidence
            )));
        }
        if args.findings.is_empty() {
            return Err(ToolError::InvalidInput(
                "findings must contain at least one entry".to_string(),
            ));
        }

        self.store.complete(&args.investigation_id)?;

        #[cfg(feature = "telemetry")]
        debug!(investigation = %args.investigation_id, "Investigation completed");

        let result = serde_json::json!({
            "status": "completed",
            "investigation_id": args.investigation_id.trim(),
            "confidence": args.confidence,
            "findings": args.findings,
            "completed_at": Utc::now().to_rfc3339(),
        });
        Ok(ToolOutput::success(result.to_string()))
    }
}

/// Handler for the `escalate_investigation` tool.
pub struct EscalateInvestigationHandler {
    store: Arc<InvestigationStore>,
}

impl EscalateInvestigationHandler {
    pub fn new(store: Arc<InvestigationStore>) -> Self {
        Self { store }
    }
}

/// Arguments for the escalate_investigation tool.
#[derive(Debug, Deserialize)]
struct EscalateArgs {
    investigation_id: String,
    reason: String,
    priority: String,
    #[serde(default)]
    #[allow(dead_code)]
    partial_findings: Option<Vec<String>>,
    #[serde(default)]
    #[allow(dead_code)]
    blocking: Option<bool>,
    #[serde(default)]
    #[allow(dead_code)]
    requires_acknowledgment: Option<bool>,
}

const PRIORITIES: [&str; 4] = ["low", "medium", "high", "critical"];

#[async_trait]
impl ToolHandler for EscalateInvestigationHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "escalate_investigation",
            "Escalate an investigation to a human with a reason and priority",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "investigation_id",
                    PropertySchema::string("Id of the investigation to escalate"),
                )
                .with_property("reason", PropertySchema::string("Why escalation is needed"))
                .with_property(
                    "priority",
                    PropertySchema::string("Escalation priority").with_enum(&PRIORITIES),
                )
                .with_property(
                    "partial_findings",
                    PropertySchema::array("string", "Findings collected so far"),
                )
                .with_property(
                    "blocking",
                    PropertySchema::boolean("Whether the investigation is blocked"),
                )
                .with_property(
                    "requires_acknowledgment",
                    PropertySchema::boolean("Whether a human must acknowledge"),
                )
                .with_required(&["investigation_id", "reason", "priority"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(investigation)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: EscalateArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("investigation", args.investigation_id.as_str());

        if args.reason.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "reason must not be empty".to_string(),
            ));
        }
        if !PRIORITIES.contains(&args.priority.as_str()) {
            return Err(ToolError::InvalidInput(format!(
                "priority must be one of [{}], got '{}'",
                PRIORITIES.join(", "),
                args.priority
            )));
        }

        self.store.escalate(&args.investigation_id)?;

        #[cfg(feature = "telemetry")]
        debug!(investigation = %args.investigation_id, priority = %args.priority, "Investigation escalated");

        let id = args.investigation_id.trim();
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let result = serde_json::json!({
            "status": "escalated",
            "escalation_id": format!("esc-{id}-{nanos}"),
            "reason": args.reason,
            "priority": args.priority,
            "escalated_at": Utc::now().to_rfc3339(),
        });
        Ok(ToolOutput::success(result.to_string()))
    }
}

/// Handler for the `report_investigation` tool.
pub struct ReportInvestigationHandler {
    store: Arc<InvestigationStore>,
}

impl ReportInvestigationHandler {
    pub fn new(store: Arc<InvestigationStore>) -> Self {
        Self { store }
    }
}

/// Arguments for the report_investigation tool.
#[derive(Debug, Deserialize)]
struct ReportArgs {
    investigation_id: String,
    message: String,
    #[serde(default)]
    progress: Option<f64>,
}

#[async_trait]
impl ToolHandler for ReportInvestigationHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "report_investigation",
            "Report progress on a running investigation without changing its state",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "investigation_id",
                    PropertySchema::string("Id of the running investigation"),
                )
                .with_property("message", PropertySchema::string("Progress message"))
                .with_property(
                    "progress",
                    PropertySchema::number("Completion percentage, 0 to 100")
                        .with_minimum(0.0)
                        .with_maximum(100.0),
                )
                .with_required(&["investigation_id", "message"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(investigation)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: ReportArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("investigation", args.investigation_id.as_str());

        if args.message.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        if let Some(progress) = args.progress {
            if !(0.0..=100.0).contains(&progress) {
                return Err(ToolError::InvalidInput(format!(
                    "progress must be between 0 and 100, got {progress}"
                )));
            }
        }

        self.store.ensure_running(&args.investigation_id)?;

        let mut result = serde_json::json!({
            "status": "reported",
            "investigation_id": args.investigation_id.trim(),
            "message": args.message,
            "reported_at": Utc::now().to_rfc3339(),
        });
        if let Some(progress) = args.progress {
            result["progress"] = serde_json::json!(progress);
        }
        Ok(ToolOutput::success(result.to_string()))
    }
}
