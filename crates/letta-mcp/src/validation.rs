// crates/letta-mcp/src/validation.rs
// ============================================================================
// Module: Argument and Response Validation
// Description: Compiled JSON Schema validators for tool inputs and outputs.
// Purpose: Reject bad arguments with field paths and police output contracts.
// Dependencies: jsonschema, letta-mcp-config, letta-mcp-contract, tracing
// ============================================================================

//! ## Overview
//! Every descriptor schema is compiled once at startup (draft 2020-12).
//! Failures are attributed to fields by validating each top-level property
//! against its own compiled subschema, and the remaining object-level rules
//! (required, closed properties, conditionals) against a shell schema whose
//! property schemas accept anything.
//!
//! Input validation is always strict. Output validation is strict unless the
//! configuration relaxes it globally or for a named tool, in which case
//! violations are logged at warn level and the value passes unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use jsonschema::Draft;
use jsonschema::Validator;
use letta_mcp_config::ValidationConfig;
use letta_mcp_contract::ToolDescriptor;
use serde_json::Value;

use crate::errors::ToolError;
use crate::errors::Violation;

// ============================================================================
// SECTION: Compiled Schemas
// ============================================================================

/// One schema compiled whole and per top-level property.
struct CompiledSchema {
    /// Validator for the full schema.
    whole: Validator,
    /// Validator with every property schema replaced by `true`.
    shell: Validator,
    /// Validators for each declared top-level property.
    properties: BTreeMap<String, Validator>,
}

impl CompiledSchema {
    /// Compiles a schema and its per-property parts.
    fn compile(schema: &Value) -> Result<Self, String> {
        let whole = compile(schema)?;
        let mut shell_schema = schema.clone();
        let mut properties = BTreeMap::new();
        if let Some(declared) = shell_schema.get_mut("properties").and_then(Value::as_object_mut) {
            for (name, property) in declared.iter_mut() {
                properties.insert(name.clone(), compile(property)?);
                *property = Value::Bool(true);
            }
        }
        let shell = compile(&shell_schema)?;
        Ok(Self {
            whole,
            shell,
            properties,
        })
    }

    /// Returns every violation with the most specific path available.
    fn violations(&self, value: &Value) -> Vec<Violation> {
        if self.whole.is_valid(value) {
            return Vec::new();
        }
        let mut violations = Vec::new();
        if let Some(object) = value.as_object() {
            for (name, field) in object {
                if let Some(validator) = self.properties.get(name) {
                    violations.extend(validator.iter_errors(field).map(|error| Violation {
                        path: format!("/{name}"),
                        message: error.to_string(),
                    }));
                }
            }
        }
        violations.extend(self.shell.iter_errors(value).map(|error| Violation {
            path: String::from("/"),
            message: error.to_string(),
        }));
        if violations.is_empty() {
            violations.extend(self.whole.iter_errors(value).map(|error| Violation {
                path: String::from("/"),
                message: error.to_string(),
            }));
        }
        violations
    }
}

/// Compiles a schema with the draft used for every descriptor.
fn compile(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("invalid schema: {err}"))
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validators for every registered tool and alias.
///
/// # Invariants
/// - Immutable after construction.
pub struct SchemaValidator {
    /// Input validators keyed by tool or alias name.
    inputs: BTreeMap<String, CompiledSchema>,
    /// Output validators keyed by tool or alias name.
    outputs: BTreeMap<String, CompiledSchema>,
    /// Output strictness policy.
    policy: ValidationConfig,
}

impl SchemaValidator {
    /// Compiles validators for the given descriptors.
    ///
    /// # Errors
    ///
    /// Returns a message naming the tool whose schema does not compile.
    pub fn new<'a>(
        descriptors: impl IntoIterator<Item = &'a ToolDescriptor>,
        policy: ValidationConfig,
    ) -> Result<Self, String> {
        let mut inputs = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        for descriptor in descriptors {
            let input = CompiledSchema::compile(&descriptor.input_schema)
                .map_err(|err| format!("{} input schema: {err}", descriptor.name))?;
            let output = CompiledSchema::compile(&descriptor.output_schema)
                .map_err(|err| format!("{} output schema: {err}", descriptor.name))?;
            inputs.insert(descriptor.name.clone(), input);
            outputs.insert(descriptor.name.clone(), output);
        }
        Ok(Self {
            inputs,
            outputs,
            policy,
        })
    }

    /// Validates tool arguments; always strict.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] listing each violation, or
    /// [`ToolError::UnknownTool`] when no schema is registered.
    pub fn check_input(&self, tool: &str, arguments: &Value) -> Result<(), ToolError> {
        let schema =
            self.inputs.get(tool).ok_or_else(|| ToolError::UnknownTool(tool.to_string()))?;
        let violations = schema.violations(arguments);
        if violations.is_empty() { Ok(()) } else { Err(ToolError::InvalidArguments(violations)) }
    }

    /// Validates a tool result under the configured output policy.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::OutputContract`] in strict mode when the value
    /// violates the output schema.
    pub fn check_output(&self, tool: &str, value: &Value) -> Result<(), ToolError> {
        let schema = self
            .outputs
            .get(tool)
            .ok_or_else(|| ToolError::Internal(format!("no output schema for {tool}")))?;
        let violations = schema.violations(value);
        if violations.is_empty() {
            return Ok(());
        }
        if self.policy.strict_output_for(tool) {
            return Err(ToolError::OutputContract(violations));
        }
        for violation in &violations {
            tracing::warn!(
                tool,
                path = %violation.path,
                message = %violation.message,
                "output schema violation ignored by lenient policy"
            );
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use letta_mcp_config::ValidationConfig;
    use letta_mcp_contract::SchemaRegistry;
    use serde_json::json;

    use super::SchemaValidator;
    use crate::errors::ToolError;

    fn validator(policy: ValidationConfig) -> SchemaValidator {
        let registry = SchemaRegistry::builtin().unwrap();
        SchemaValidator::new(registry.descriptors(), policy).unwrap()
    }

    #[test]
    fn input_violations_carry_field_paths() {
        let validator = validator(ValidationConfig::default());
        let error = validator
            .check_input("letta_job_monitor", &json!({ "operation": "get", "job_id": 7 }))
            .unwrap_err();
        let ToolError::InvalidArguments(violations) = error else {
            panic!("expected schema violations");
        };
        assert!(violations.iter().any(|violation| violation.path == "/job_id"));
    }

    #[test]
    fn undeclared_input_fields_are_reported_at_root() {
        let validator = validator(ValidationConfig::default());
        let error = validator
            .check_input("letta_job_monitor", &json!({ "operation": "list", "bogus": true }))
            .unwrap_err();
        assert!(error.to_string().contains("bogus"));
    }

    #[test]
    fn lenient_outputs_pass_unchanged() {
        let lenient = ValidationConfig {
            strict_outputs: true,
            lenient_output_tools: vec!["letta_job_monitor".to_string()],
        };
        let validator = validator(lenient);
        let output = json!({ "success": true, "operation": "list", "surprise": 1 });
        assert!(validator.check_output("letta_job_monitor", &output).is_ok());
        assert!(matches!(
            validator.check_output("letta_mcp_ops", &output),
            Err(ToolError::OutputContract(_))
        ));
    }
}
