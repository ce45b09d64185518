// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Skill activation tool handler.
//!
//! Looks a skill up by name through the configured [`SkillManager`] and
//! returns a frontmatter document followed by the skill's raw content. A
//! miss triggers one discovery-cache refresh and retry.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::ToolError;
use crate::skills::{Skill, SkillManager};
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Handler for the `activate_skill` tool.
pub struct ActivateSkillHandler {
    manager: Arc<RwLock<Option<Arc<dyn SkillManager>>>>,
    description: String,
}

impl ActivateSkillHandler {
    pub fn new(
        manager: Arc<RwLock<Option<Arc<dyn SkillManager>>>>,
        description: String,
    ) -> Self {
        Self {
            manager,
            description,
        }
    }

    /// Build the user-visible description from a discovered skill list.
    pub fn describe(skills: &crate::skills::SkillList) -> String {
        if skills.skills.is_empty() {
            return "Activate a skill by name. No skills are currently available.".to_string();
        }
        let names: Vec<String> = skills
            .skills
            .iter()
            .map(|s| format!("{} ({})", s.name, s.description))
            .collect();
        format!(
            "Activate a skill by name. Available skills: {}",
            names.join(", ")
        )
    }
}

/// Arguments for the activate_skill tool.
#[derive(Debug, Deserialize)]
struct ActivateSkillArgs {
    skill_name: String,
}

#[async_trait]
impl ToolHandler for ActivateSkillHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("activate_skill", &self.description).with_schema(
            InputSchema::new()
                .with_property(
                    "skill_name",
                    PropertySchema::string("Name of the skill to activate"),
                )
                .with_required(&["skill_name"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(skill)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: ActivateSkillArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("skill", args.skill_name.as_str());

        let manager = {
            let guard = self.manager.read().expect("skill manager lock poisoned");
            guard.clone()
        }
        .ok_or_else(|| ToolError::NotAvailable("no skill manager configured".to_string()))?;

        let skill = match manager.load_metadata(&args.skill_name).await {
            Ok(skill) => skill,
            Err(ToolError::NotFound(_)) => {
                // Stale cache: refresh discovery once and retry
                manager.refresh().await?;
                manager.load_metadata(&args.skill_name).await?
            }
            Err(e) => return Err(e),
        };

        #[cfg(feature = "telemetry")]
        debug!(skill = %skill.name, "Skill activated");

        Ok(ToolOutput::success(render_skill(&skill)?))
    }
}

/// Render a skill as a frontmatter block followed by its raw content.
fn render_skill(skill: &Skill) -> Result<String, ToolError> {
    let mut front = serde_yaml::Mapping::new();
    front.insert("name".into(), skill.name.clone().into());
    front.insert("description".into(), skill.description.clone().into());
    if let Some(license) = &skill.license {
        front.insert("license".into(), license.clone().into());
    }
    if let Some(compatibility) = &skill.compatibility {
        front.insert(
            "compatibility".into(),
            serde_yaml::Value::Sequence(
                compatibility.iter().map(|c| c.clone().into()).collect(),
            ),
        );
    }
    if let Some(tools) = &skill.allowed_tools {
        front.insert(
            "allowed-tools".into(),
            serde_yaml::Value::Sequence(tools.iter().map(|t| t.clone().into()).collect()),
        );
    }
    for (key, value) in &skill.metadata {
        let value = serde_yaml::to_value(value)
            .map_err(|e| ToolError::IoError(format!("failed to render metadata: {e}")))?;
        front.insert(format!("metadata.{key}").into(), value);
    }

    let yaml = serde_yaml::to_string(&front)
        .map_err(|e| ToolError::IoError(format!("failed to render frontmatter: {e}")))?;

    Ok(format!("---\n{yaml}---\n\n{}", skill.raw_content))
}
