// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! List files tool handler.
//!
//! Returns a JSON array of paths relative to the requested directory,
//! excluding `.git` trees.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::ToolError;
use crate::fs::FileManager;
use crate::safety::resolve_within_root;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, PropertySchema, ToolDefinition};

/// Handler for the `list_files` tool.
pub struct ListFilesHandler {
    root: PathBuf,
    fs: Arc<dyn FileManager>,
}

impl ListFilesHandler {
    pub fn new(root: PathBuf, fs: Arc<dyn FileManager>) -> Self {
        Self { root, fs }
    }
}

/// Arguments for the list_files tool.
#[derive(Debug, Deserialize)]
struct ListFilesArgs {
    /// Directory to list, relative to the working root.
    #[serde(default = "default_path")]
    path: String,
}

fn default_path() -> String {
    ".".to_string()
}

#[async_trait]
impl ToolHandler for ListFilesHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "list_files",
            "List files and directories under a path as a JSON array of relative paths",
        )
        .with_schema(InputSchema::new().with_property(
            "path",
            PropertySchema::string("Directory to list, relative to the working root (default: .)"),
        ))
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(path, entries)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: ListFilesArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("path", args.path.as_str());

        let dir = resolve_within_root(&self.root, &args.path)?;
        let entries = self.fs.list(&dir).await?;

        #[cfg(feature = "telemetry")]
        {
            tracing::Span::current().record("entries", entries.len());
            debug!(path = %args.path, entries = entries.len(), "Directory listed");
        }

        let json = serde_json::to_string(&entries)
            .map_err(|e| ToolError::IoError(format!("failed to encode listing: {e}")))?;
        Ok(ToolOutput::success(json))
    }
}
