// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tool registry and handler trait.
//!
//! The registry is a thread-safe mapping from tool name to a registered
//! descriptor and handler. Insertions and removals are serialized; readers
//! take a consistent snapshot per call and never observe a partially
//! written descriptor. Re-registering a name replaces the entry atomically,
//! which the engine uses to rebuild tool descriptions when external data
//! changes (e.g. the discovered skill list).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ToolError;
use crate::types::ToolDefinition;

/// Output from executing a tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub success: bool,
}

impl ToolOutput {
    /// Create a successful text output.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
        }
    }

    /// Create an error text output.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: false,
        }
    }

    /// Get the content string.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Check if the output indicates success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get a preview suitable for logging (truncated).
    pub fn log_preview(&self, max_bytes: usize) -> String {
        super::truncate_text(&self.content, max_bytes)
    }
}

/// Trait that all tool handlers must implement.
///
/// Each tool is a struct holding its own collaborators (filesystem, policy,
/// HTTP client). Handlers receive the caller's [`Context`] and must honor
/// its cancellation and deadline.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition (name, description, input schema).
    fn definition(&self) -> ToolDefinition;

    /// Returns true if this tool may mutate the environment.
    fn is_mutating(&self) -> bool {
        false
    }

    /// Execute the tool with the given input parameters.
    async fn execute(
        &self,
        ctx: &Context,
        input: serde_json::Value,
    ) -> Result<ToolOutput, ToolError>;
}

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

/// Thread-safe registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool handler, validating its descriptor.
    ///
    /// Re-registering an existing name replaces the entry atomically.
    pub fn register(&self, handler: Arc<dyn ToolHandler>) -> Result<(), ToolError> {
        let definition = handler.definition();
        validate_definition(&definition)?;

        let mut tools = self.tools.write().expect("registry lock poisoned");
        tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler,
            },
        );
        Ok(())
    }

    /// Remove a tool by name. Returns true if it was present.
    pub fn unregister(&self, name: &str) -> bool {
        let mut tools = self.tools.write().expect("registry lock poisoned");
        tools.remove(name).is_some()
    }

    /// Get a tool's definition and handler by name.
    pub fn get(&self, name: &str) -> Option<(ToolDefinition, Arc<dyn ToolHandler>)> {
        let tools = self.tools.read().expect("registry lock poisoned");
        tools
            .get(name)
            .map(|t| (t.definition.clone(), Arc::clone(&t.handler)))
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        let tools = self.tools.read().expect("registry lock poisoned");
        tools.contains_key(name)
    }

    /// Snapshot of all tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().expect("registry lock poisoned");
        let mut definitions: Vec<ToolDefinition> =
            tools.values().map(|t| t.definition.clone()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Snapshot of all tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let tools = self.tools.read().expect("registry lock poisoned");
        let mut names: Vec<String> = tools.keys().cloned().collect();
        names.sort();
        names
    }
}

fn validate_definition(definition: &ToolDefinition) -> Result<(), ToolError> {
    if definition.name.trim().is_empty() {
        return Err(ToolError::InvalidInput(
            "tool name must not be empty".to_string(),
        ));
    }
    if definition.input_schema.schema_type != "object" {
        return Err(ToolError::InvalidInput(format!(
            "tool '{}' input schema must have type 'object', got '{}'",
            definition.name, definition.input_schema.schema_type
        )));
    }
    for required in &definition.input_schema.required {
        if !definition.input_schema.properties.contains_key(required) {
            return Err(ToolError::InvalidInput(format!(
                "tool '{}' requires undeclared property '{required}'",
                definition.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InputSchema, PropertySchema};

    struct MockTool {
        name: String,
        description: String,
    }

    impl MockTool {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                description: "A mock tool".to_string(),
            }
        }
    }

    #[async_trait]
    impl ToolHandler for MockTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(&self.name, &self.description).with_schema(
                InputSchema::new()
                    .with_property("value", PropertySchema::string("A value"))
                    .with_required(&["value"]),
            )
        }

        async fn execute(
            &self,
            _ctx: &Context,
            _input: serde_json::Value,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success("mock result"))
        }
    }

    struct BadSchemaTool;

    #[async_trait]
    impl ToolHandler for BadSchemaTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("bad", "Requires an undeclared field").with_schema(
                InputSchema::new().with_required(&["ghost"]),
            )
        }

        async fn execute(
            &self,
            _ctx: &Context,
            _input: serde_json::Value,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(""))
        }
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("mock1"))).unwrap();

        assert!(registry.contains("mock1"));
        let (def, _) = registry.get("mock1").unwrap();
        assert_eq!(def.name, "mock1");
        assert!(registry.definitions().iter().any(|d| d.name == "mock1"));
    }

    #[test]
    fn test_get_missing() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_unregister() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("mock1"))).unwrap();
        assert!(registry.unregister("mock1"));
        assert!(!registry.unregister("mock1"));
        assert!(!registry.contains("mock1"));
    }

    #[test]
    fn test_reregister_replaces() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("mock1"))).unwrap();
        registry
            .register(Arc::new(MockTool {
                name: "mock1".to_string(),
                description: "Updated description".to_string(),
            }))
            .unwrap();

        let (def, _) = registry.get("mock1").unwrap();
        assert_eq!(def.description, "Updated description");
        assert_eq!(registry.names().len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_descriptor() {
        let registry = ToolRegistry::new();

        let err = registry.register(Arc::new(MockTool::new("  "))).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let err = registry.register(Arc::new(BadSchemaTool)).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_names_sorted() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new("zeta"))).unwrap();
        registry.register(Arc::new(MockTool::new("alpha"))).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let registry = Arc::new(ToolRegistry::new());
        let mut handles = Vec::new();

        for i in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    let name = format!("tool-{i}-{j}");
                    registry.register(Arc::new(MockTool::new(&name))).unwrap();
                    assert!(registry.contains(&name));
                }
            }));
        }
        for i in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    let _ = registry.definitions();
                    let _ = registry.get(&format!("tool-{i}-0"));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.names().len(), 200);
    }
}
