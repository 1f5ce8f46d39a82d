//! JSON Schema Dereferencer
//!
//! Resolves `$ref` pointers in JSON Schema documents and inlines their targets.
//!
//! References may point into the same document (`#/definitions/A`), into
//! another file (`common.json#/$defs/id`) or at a remote document
//! (`https://example.com/schemas/pet.json`). External documents are loaded
//! once per call and their own references are resolved relative to where they
//! were loaded from.
//!
//! # Example
//!
//! ```
//! use schema_deref::{dereference, DerefOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "a": { "$ref": "#/definitions/A" }
//!     },
//!     "definitions": {
//!         "A": { "type": "string" }
//!     }
//! });
//!
//! let resolved = dereference(&schema, &DerefOptions::new()).unwrap();
//! assert_eq!(resolved["properties"]["a"], json!({ "type": "string" }));
//! ```
//!
//! # Circular References
//!
//! | Policy | Effect |
//! |--------|--------|
//! | `PreserveAsMarker` (default) | Emit `{"$ref": "#/..."}` pointing at the enclosing copy in the output |
//! | `Error` | Fail with `DerefError::CircularReference` |
//! | `Inline` | Keep expanding; cycles fail with `DerefError::DepthExceeded` once a depth bound is hit |

mod dereferencer;
mod error;
mod loader;
mod location;
mod output;
mod pointer;
mod types;
mod validator;

pub use dereferencer::{dereference, dereference_source, Dereferencer};
pub use error::{DepthLimit, DerefError, LoadError, OutputError};
pub use loader::{DefaultLoader, Loader};
pub use location::{display_location, is_url, resolve_reference, source_base, Target};
pub use output::{to_json, write_output, STDOUT};
pub use pointer::{escape_component, format_pointer, navigate, parse_pointer, unescape_component};
pub use types::{
    CircularPolicy, DerefOptions, DEFAULT_LOADER_TIMEOUT, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING,
    REF_KEY,
};
pub use validator::check_schema;

pub use url::Url;
