//! Compile check for dereferenced schemas.

use serde_json::Value;

use crate::error::DerefError;

/// Check that `schema` compiles as a JSON Schema.
///
/// Meant for dereferenced output, where the only remaining `$ref` nodes are
/// in-document back-references.
///
/// # Errors
///
/// Returns `DerefError::InvalidSchema` with the compiler's message.
pub fn check_schema(schema: &Value) -> Result<(), DerefError> {
    jsonschema::validator_for(schema)
        .map(|_| ())
        .map_err(|e| DerefError::InvalidSchema {
            message: e.to_string(),
        })
}
