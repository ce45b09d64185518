// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read file tool handler.
//!
//! Reads a file relative to the working root and returns its content as
//! numbered lines, optionally bounded to a line range.

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

/// Handler for the `read_file` tool.
pub struct ReadFileHandler {
    root: PathBuf,
    fs: Arc<dyn FileManager>,
}

impl ReadFileHandler {
    pub fn new(root: PathBuf, fs: Arc<dyn FileManager>) -> Self {
        Self { root, fs }
    }
}

/// Arguments for the read_file tool.
#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    /// Path relative to the working root.
    path: String,

    /// 1-indexed first line to include.
    #[serde(default)]
    start_line: Option<usize>,

    /// 1-indexed last line to include.
    #[serde(default)]
    end_line: Option<usize>,
}

#[async_trait]
impl ToolHandler for ReadFileHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "read_file",
            "Read the contents of a file as numbered lines, optionally bounded to a line range",
        )
        .with_schema(
            InputSchema::new()
                .with_property(
                    "path",
                    PropertySchema::string("Path to the file, relative to the working root"),
                )
                .with_property(
                    "start_line",
                    PropertySchema::integer("1-indexed first line to include").with_minimum(1.0),
                )
                .with_property(
                    "end_line",
                    PropertySchema::integer("1-indexed last line to include").with_minimum(1.0),
                )
                .with_required(&["path"]),
        )
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, _ctx, input), fields(path)))]
    async fn execute(
        &self,
        _ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: ReadFileArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("path", args.path.as_str());

        if let (Some(start), Some(end)) = (args.start_line, args.end_line) {
            if start > end {
                return Err(ToolError::InvalidInput(format!(
                    "start_line ({start}) must not exceed end_line ({end})"
                )));
            }
        }

        let path = resolve_within_root(&self.root, &args.path)?;
        let content = self.fs.read(&path).await?;

        let start = args.start_line.unwrap_or(1);
        let end = args.end_line.unwrap_or(usize::MAX);

        let mut numbered = String::new();
        for (index, line) in content.lines().enumerate() {
            let number = index + 1;
            if number < start {
                continue;
            }
            if number > end {
                break;
            }
            numbered.push_str(&format!("{number}: {line}\n"));
        }

        #[cfg(feature = "telemetry")]
        debug!(path = %args.path, bytes = numbered.len(), "File read complete");

        Ok(ToolOutput::success(numbered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFileManager;
    use tempfile::tempdir;

    fn handler(root: &std::path::Path) -> ReadFileHandler {
        ReadFileHandler::new(root.to_path_buf(), Arc::new(LocalFileManager))
    }

    #[tokio::test]
    async fn test_read_file_numbered() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("file.txt"), "alpha\nbeta\ngamma\n").unwrap();

        let result = handler(temp.path())
            .execute(&Context::background(), serde_json::json!({"path": "file.txt"}))
            .await
            .unwrap();

        assert_eq!(result.content(), "1: alpha\n2: beta\n3: gamma\n");
    }

    #[tokio::test]
    async fn test_read_file_range() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("file.txt"), "a\nb\nc\nd\n").unwrap();

        let result = handler(temp.path())
            .execute(
                &Context::background(),
                serde_json::json!({"path": "file.txt", "start_line": 2, "end_line": 3}),
            )
            .await
            .unwrap();

        assert_eq!(result.content(), "2: b\n3: c\n");
    }

    #[tokio::test]
    async fn test_read_file_range_clamped() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("file.txt"), "a\nb\n").unwrap();

        let result = handler(temp.path())
            .execute(
                &Context::background(),
                serde_json::json!({"path": "file.txt", "start_line": 1, "end_line": 99}),
            )
            .await
            .unwrap();

        assert_eq!(result.content(), "1: a\n2: b\n");
    }

    #[tokio::test]
    async fn test_read_file_inverted_range() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("file.txt"), "a\n").unwrap();

        let err = handler(temp.path())
            .execute(
                &Context::background(),
                serde_json::json!({"path": "file.txt", "start_line": 3, "end_line": 1}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_read_file_traversal_rejected() {
        let temp = tempdir().unwrap();

        let err = handler(temp.path())
            .execute(
                &Context::background(),
                serde_json::json!({"path": "../../etc/passwd"}),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::PathTraversal(_)));
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let temp = tempdir().unwrap();

        let err = handler(temp.path())
            .execute(&Context::background(), serde_json::json!({"path": "missing.txt"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::FileNotFound(_)));
    }
}
