// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Edit file tool handler.
//!
//! Performs a global literal substring replacement, or creates a new file
//! when the old string is empty and the target does not exist.

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

/// Handler for the `edit_file` tool.
pub struct EditFileHandler {
    root: PathBuf,
    fs: Arc<dyn FileManager>,
}

impl EditFileHandler {
    pub fn new(root: PathBuf, fs: Arc<dyn FileManager>) -> Self {
        Self { root, fs }
    }
}

/// Arguments for the edit_file tool.
#[derive(Debug, Deserialize)]
struct EditFileArgs {
    /// Path relative to the working root.
    path: String,

    /// The exact text to find. Empty creates a new file.
    #[serde(default)]
    old_str: String,

    /// The text to replace it with.
    #[serde(default)]
    new_str: String,
}

#[async_trait]
impl ToolHandler for EditFileHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "edit_file",
            "Replace text in a file, or create it when old_str is empty and the file does not exist",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    PropertySchema::string("Path to the file, relative to the working root"),
                )
                .with_property(
                    "old_str",
                    PropertySchema::string("The exact text to find (empty to create a new file)"),
                )
                .with_property(
                    "new_str",
                    PropertySchema::string("The text to replace it with"),
                )
                .with_required(&["path"]),
        )
    }

    fn is_mutating(&self) -> bool {
        true
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(path, created)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: EditFileArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("path", args.path.as_str());

        if args.old_str == args.new_str {
            return Err(ToolError::InvalidInput(
                "new_str must be different from old_str".to_string(),
            ));
        }

        let path = resolve_within_root(&self.root, &args.path)?;

        if args.old_str.is_empty() && !self.fs.exists(&path).await {
            self.fs.write(&path, &args.new_str).await?;

            #[cfg(feature = "telemetry")]
            {
                tracing::Span::current().record("created", true);
                debug!(path = %args.path, "File created");
            }

            return Ok(ToolOutput::success(format!("Created file {}", args.path)));
        }

        let content = self.fs.read(&path).await?;
        let replaced = content.replace(&args.old_str, &args.new_str);

        if replaced == content && !args.old_str.is_empty() {
            return Err(ToolError::InvalidInput(
                "old string not found in file".to_string(),
            ));
        }

        self.fs.write(&path, &replaced).await?;

        #[cfg(feature = "telemetry")]
        debug!(path = %args.path, "Edit complete");

        Ok(ToolOutput::success("OK"))
    }
}
