//! JSON Schema enforcement for package descriptors.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::path::Path;

use crate::error::ValidationError;

/// Schema bundled with the tool.
pub const BUNDLED_SCHEMA: &str = include_str!("../schema/schema.json");

/// Compiled descriptor schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compiles the bundled schema.
    pub fn bundled() -> Result<Self> {
        let schema: Value =
            serde_json::from_str(BUNDLED_SCHEMA).context("Failed to parse bundled schema")?;
        Self::from_value(&schema)
    }

    /// Compiles a schema read from `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema {}", path.display()))?;
        let schema: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse schema {}", path.display()))?;
        Self::from_value(&schema)
    }

    pub fn from_value(schema: &Value) -> Result<Self> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| anyhow!("Invalid schema: {}", e))?;
        Ok(Self { validator })
    }

    /// Returns one [`ValidationError::SchemaViolation`] per violation found;
    /// empty when the descriptor conforms.
    pub fn validate(&self, meta: &Value) -> Vec<ValidationError> {
        self.validator
            .iter_errors(meta)
            .map(|e| ValidationError::SchemaViolation {
                message: e.to_string(),
            })
            .collect()
    }
}
