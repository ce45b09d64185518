// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Skill manager boundary.
//!
//! Skills are named documents with YAML frontmatter plus content. Discovery
//! and on-disk loading live behind the [`SkillManager`] trait; the engine
//! only consumes the metadata and raw content when a skill is activated.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Summary of a discovered skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    /// Where the skill was discovered (e.g. "project", "global").
    pub source_type: String,
}

/// Result of a discovery pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillList {
    pub skills: Vec<SkillSummary>,
}

/// A fully loaded skill: frontmatter metadata plus raw content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub compatibility: Option<Vec<String>>,
    #[serde(default, rename = "allowed-tools")]
    pub allowed_tools: Option<Vec<String>>,
    /// Extension fields surfaced as `metadata.*` in the rendered document.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub source_type: String,
    /// The skill body, returned verbatim to the model on activation.
    pub raw_content: String,
}

/// Capability contract for skill discovery and loading.
#[async_trait]
pub trait SkillManager: Send + Sync {
    /// List known skills. May serve from a cache.
    async fn discover(&self) -> Result<SkillList, ToolError>;

    /// Load a skill's metadata and raw content by name.
    async fn load_metadata(&self, name: &str) -> Result<Skill, ToolError>;

    /// Invalidate the discovery cache so the next lookup re-scans.
    async fn refresh(&self) -> Result<(), ToolError>;
}
