// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Input validation against a tool's declared schema.
//!
//! Validation happens at dispatch time, before the handler runs: required
//! fields, strict type conformance, enum membership, numeric bounds, and
//! array element types. Undeclared properties are accepted; handlers that
//! need to reject them do so explicitly.

use serde_json::Value;

use crate::error::ToolError;
use crate::types::{PropertySchema, ToolDefinition};

/// Parse raw JSON input.
pub fn parse_raw(raw: &str) -> Result<Value, ToolError> {
    serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidInput(format!("invalid JSON: failed to parse: {e}")))
}

/// Validate a raw JSON object against a tool's declared input schema.
pub fn validate_input(def: &ToolDefinition, input: &Value) -> Result<(), ToolError> {
    let obj = match input {
        Value::Object(map) => map,
        Value::Null => {
            if def.input_schema.required.is_empty() {
                return Ok(());
            }
            return Err(ToolError::InvalidInput(format!(
                "required parameters missing for {}: input is empty",
                def.name
            )));
        }
        other => {
            return Err(ToolError::InvalidInput(format!(
                "input must be a JSON object, got {}",
                type_name(other)
            )));
        }
    };

    for field in &def.input_schema.required {
        match obj.get(field) {
            None | Some(Value::Null) => {
                return Err(ToolError::MissingParameter(field.clone()));
            }
            Some(_) => {}
        }
    }

    for (name, schema) in &def.input_schema.properties {
        let Some(value) = obj.get(name) else {
            continue;
        };
        if value.is_null() {
            // Null optional fields are treated as absent
            continue;
        }
        check_property(name, schema, value)?;
    }

    Ok(())
}

fn check_property(name: &str, schema: &PropertySchema, value: &Value) -> Result<(), ToolError> {
    match schema.prop_type.as_str() {
        "string" => {
            let Value::String(s) = value else {
                return Err(type_mismatch(name, "string", value));
            };
            if let Some(allowed) = &schema.enum_values {
                if !allowed.iter().any(|a| a == s) {
                    return Err(ToolError::InvalidInput(format!(
                        "{name} must be one of [{}], got '{s}'",
                        allowed.join(", ")
                    )));
                }
            }
        }
        "integer" => {
            if !value.is_i64() && !value.is_u64() {
                return Err(type_mismatch(name, "integer", value));
            }
            check_bounds(name, schema, value.as_f64().unwrap_or_default())?;
        }
        "number" => {
            let Some(n) = value.as_f64() else {
                return Err(type_mismatch(name, "number", value));
            };
            check_bounds(name, schema, n)?;
        }
        "boolean" => {
            if !value.is_boolean() {
                return Err(type_mismatch(name, "boolean", value));
            }
        }
        "array" => {
            let Value::Array(elements) = value else {
                return Err(type_mismatch(name, "array", value));
            };
            if let Some(items) = &schema.items {
                for (i, element) in elements.iter().enumerate() {
                    if !element_matches(&items.item_type, element) {
                        return Err(ToolError::InvalidInput(format!(
                            "{name}[{i}] must be of type {}, got {}",
                            items.item_type,
                            type_name(element)
                        )));
                    }
                }
            }
        }
        "object" => {
            if !value.is_object() {
                return Err(type_mismatch(name, "object", value));
            }
        }
        // Unknown declared type: accept, the handler decides
        _ => {}
    }
    Ok(())
}

fn check_bounds(name: &str, schema: &PropertySchema, n: f64) -> Result<(), ToolError> {
    if let Some(min) = schema.minimum {
        if n < min {
            return Err(ToolError::InvalidInput(format!(
                "{name} must be >= {min}, got {n}"
            )));
        }
    }
    if let Some(max) = schema.maximum {
        if n > max {
            return Err(ToolError::InvalidInput(format!(
                "{name} must be <= {max}, got {n}"
            )));
        }
    }
    Ok(())
}

fn element_matches(item_type: &str, value: &Value) -> bool {
    match item_type {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_mismatch(name: &str, expected: &str, value: &Value) -> ToolError {
    ToolError::InvalidInput(format!(
        "{name} must be of type {expected}, got {}",
        type_name(value)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
