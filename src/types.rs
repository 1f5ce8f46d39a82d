//! Core types for schema dereferencing.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key that marks a reference node.
pub const REF_KEY: &str = "$ref";

/// Default per-load timeout (10 seconds).
pub const DEFAULT_LOADER_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on nested reference expansions along one chain.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default bound on how deeply a reference may be expanded inside the output.
///
/// The walk recurses once per output level, so this keeps the native stack
/// bounded no matter how deep each expanded target is.
pub const DEFAULT_MAX_NESTING: usize = 1024;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// What to do when a reference points back into the chain being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CircularPolicy {
    /// Expand the target again. Real cycles end in `DepthExceeded`.
    Inline,
    /// Fail the call with `CircularReference`.
    Error,
    /// Emit a `{"$ref": "#/..."}` back-reference into the output document.
    #[default]
    PreserveAsMarker,
}

impl CircularPolicy {
    /// Parse a policy name.
    ///
    /// Accepts `inline`, `error` and `marker` (or `preserveAsMarker`).
    /// Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inline" => Some(CircularPolicy::Inline),
            "error" => Some(CircularPolicy::Error),
            "marker" | "preserveAsMarker" => Some(CircularPolicy::PreserveAsMarker),
            _ => None,
        }
    }
}

/// Options for a dereference call.
#[derive(Debug, Clone)]
pub struct DerefOptions {
    /// Handling of circular references.
    pub circular: CircularPolicy,
    /// Timeout handed to the loader for each external document.
    pub loader_timeout: Duration,
    /// Maximum number of nested reference expansions on one chain.
    pub max_depth: usize,
    /// Deepest output position at which a reference is still expanded.
    pub max_nesting: usize,
    /// Overall time budget for the whole call. `None` means unbounded.
    pub deadline: Option<Duration>,
}

impl Default for DerefOptions {
    fn default() -> Self {
        Self {
            circular: CircularPolicy::default(),
            loader_timeout: DEFAULT_LOADER_TIMEOUT,
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            deadline: None,
        }
    }
}

impl DerefOptions {
    /// Create options with defaults: marker policy, 10s loads, depth 128, no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the circular reference policy.
    pub fn circular(mut self, policy: CircularPolicy) -> Self {
        self.circular = policy;
        self
    }

    /// Set the per-load timeout.
    pub fn loader_timeout(mut self, timeout: Duration) -> Self {
        self.loader_timeout = timeout;
        self
    }

    /// Set the maximum resolution depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the output nesting bound for reference expansion.
    pub fn max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Set the overall deadline for the call.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}
