//! Error types for schema dereferencing and output.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a document could not be fetched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error(transparent)]
    Network(#[from] reqwest::Error),

    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("unsupported scheme \"{0}\"")]
    UnsupportedScheme(String),

    #[error("file URL does not name a local path")]
    NotLocalPath,
}

/// Which depth guard stopped a dereference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLimit {
    /// Too many reference expansions nested on one chain.
    References(usize),
    /// The output grew too deeply nested.
    Nesting(usize),
}

impl fmt::Display for DepthLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthLimit::References(n) => write!(f, "more than {} nested references", n),
            DepthLimit::Nesting(n) => write!(f, "output nested more than {} levels", n),
        }
    }
}

/// Errors during dereferencing.
#[derive(Debug, Error)]
pub enum DerefError {
    // IO errors (exit code 3)
    #[error("failed to load {location}: {source}")]
    LoadFailure {
        location: String,
        #[source]
        source: LoadError,
    },

    #[error("deadline of {}ms exceeded before loading {location}", .deadline.as_millis())]
    DeadlineExceeded { location: String, deadline: Duration },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {location}: {source}")]
    ParseFailure {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    // Reference errors (exit code 2)
    #[error("invalid $ref \"{reference}\": {message}")]
    InvalidReference { reference: String, message: String },

    #[error("cannot resolve $ref \"{reference}\": {pointer:?} not found in {location}")]
    UnresolvableReference {
        reference: String,
        location: String,
        pointer: String,
    },

    #[error("circular reference \"{reference}\" at {location}")]
    CircularReference { reference: String, location: String },

    #[error("maximum resolution depth exceeded at $ref \"{reference}\": {limit}")]
    DepthExceeded { reference: String, limit: DepthLimit },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl DerefError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DerefError::LoadFailure { .. } | DerefError::DeadlineExceeded { .. } => 3,
            _ => 2,
        }
    }

    /// Returns true for errors caused by fetching a document.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, DerefError::LoadFailure { .. })
    }
}

/// Errors while serializing or writing the dereferenced document.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot serialize output: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            OutputError::Serialize { .. } => 2,
            OutputError::Write { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deref_error_exit_codes() {
        let err = DerefError::LoadFailure {
            location: "/schemas/missing.json".into(),
            source: LoadError::NotFound,
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_load_failure());

        let err = DerefError::CircularReference {
            reference: "#/definitions/node".into(),
            location: "/schemas/main.json#/definitions/node/properties/next".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(!err.is_load_failure());

        let err = DerefError::DeadlineExceeded {
            location: "https://example.com/a.json".into(),
            deadline: Duration::from_millis(50),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn output_error_exit_codes() {
        let err = OutputError::Write {
            path: PathBuf::from("out.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn load_failure_display_names_location() {
        let err = DerefError::LoadFailure {
            location: "/tmp/missing.json".into(),
            source: LoadError::NotFound,
        };
        assert_eq!(
            err.to_string(),
            "failed to load /tmp/missing.json: file not found"
        );
    }

    #[test]
    fn depth_exceeded_display_names_limit() {
        let err = DerefError::DepthExceeded {
            reference: "#/definitions/node".into(),
            limit: DepthLimit::References(10),
        };
        assert_eq!(
            err.to_string(),
            "maximum resolution depth exceeded at $ref \"#/definitions/node\": more than 10 nested references"
        );
        assert_eq!(err.exit_code(), 2);

        let err = DerefError::DepthExceeded {
            reference: "#/definitions/deep".into(),
            limit: DepthLimit::Nesting(1024),
        };
        assert!(err.to_string().ends_with("output nested more than 1024 levels"));
    }

    #[test]
    fn unresolvable_display() {
        let err = DerefError::UnresolvableReference {
            reference: "#/definitions/B".into(),
            location: "/tmp/main.json".into(),
            pointer: "/definitions/B".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve $ref \"#/definitions/B\": \"/definitions/B\" not found in /tmp/main.json"
        );
    }
}
