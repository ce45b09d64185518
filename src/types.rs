// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the cogent engine.
//!
//! This module defines the tool descriptor and its input schema. The schema
//! is a structured document describing a single top-level object: properties,
//! required fields, and per-property constraints (type, enum, numeric bounds,
//! array element type). It serializes to the JSON-Schema shape expected by
//! model clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema for the elements of an array property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsSchema {
    #[serde(rename = "type")]
    pub item_type: String,
}

/// Schema for a single property of a tool's input object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemsSchema>,
}

impl PropertySchema {
    fn typed(prop_type: &str, description: impl Into<String>) -> Self {
        Self {
            prop_type: prop_type.to_string(),
            description: Some(description.into()),
            enum_values: None,
            minimum: None,
            maximum: None,
            items: None,
        }
    }

    /// A string property.
    pub fn string(description: impl Into<String>) -> Self {
        Self::typed("string", description)
    }

    /// An integer property.
    pub fn integer(description: impl Into<String>) -> Self {
        Self::typed("integer", description)
    }

    /// A floating-point number property.
    pub fn number(description: impl Into<String>) -> Self {
        Self::typed("number", description)
    }

    /// A boolean property.
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed("boolean", description)
    }

    /// An object property.
    pub fn object(description: impl Into<String>) -> Self {
        Self::typed("object", description)
    }

    /// An array property with a declared element type.
    pub fn array(item_type: &str, description: impl Into<String>) -> Self {
        let mut schema = Self::typed("array", description);
        schema.items = Some(ItemsSchema {
            item_type: item_type.to_string(),
        });
        schema
    }

    /// An array property without a declared element type.
    pub fn untyped_array(description: impl Into<String>) -> Self {
        Self::typed("array", description)
    }

    /// Restrict a string property to an enumerated set of values.
    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Set an inclusive lower bound for a numeric property.
    pub fn with_minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    /// Set an inclusive upper bound for a numeric property.
    pub fn with_maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }
}

/// JSON Schema for tool input parameters.
///
/// Always a single top-level object. Properties are kept in a `BTreeMap` so
/// serialized descriptors are stable across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Always "object"
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Create a new input schema with object type.
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a property to the schema.
    pub fn with_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Mark properties as required.
    pub fn with_required(mut self, required: &[&str]) -> Self {
        self.required = required.iter().map(|r| r.to_string()).collect();
        self
    }
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Definition of a tool that can be called by the AI model.
///
/// Identity key is `name`; names are unique within a registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::new(),
        }
    }

    /// Set the input schema for this tool.
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new("read_file", "Read contents of a file").with_schema(
            InputSchema::new()
                .with_property("path", PropertySchema::string("File path"))
                .with_required(&["path"]),
        );

        assert_eq!(tool.name, "read_file");
        assert_eq!(tool.input_schema.properties.len(), 1);
        assert!(tool.input_schema.properties.contains_key("path"));
        assert_eq!(tool.input_schema.required, vec!["path".to_string()]);
    }

    #[test]
    fn test_schema_serialization() {
        let schema = InputSchema::new()
            .with_property(
                "severity",
                PropertySchema::string("Severity level").with_enum(&["info", "warning"]),
            )
            .with_property(
                "confidence",
                PropertySchema::number("Confidence")
                    .with_minimum(0.0)
                    .with_maximum(1.0),
            )
            .with_property("findings", PropertySchema::array("string", "Findings"))
            .with_required(&["severity"]);

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["severity"]["enum"][0], "info");
        assert_eq!(json["properties"]["confidence"]["minimum"], 0.0);
        assert_eq!(json["properties"]["findings"]["items"]["type"], "string");
        assert_eq!(json["required"][0], "severity");
    }

    #[test]
    fn test_schema_roundtrip() {
        let schema = InputSchema::new()
            .with_property("path", PropertySchema::string("File path"))
            .with_required(&["path"]);

        let json = serde_json::to_string(&schema).unwrap();
        let back: InputSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema_type, "object");
        assert!(back.properties.contains_key("path"));
    }
}
