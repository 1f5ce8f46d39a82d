//! Resolution of `$ref` strings to canonical document locations.
//!
//! Every document is identified by a URL without fragment: local files use
//! `file://` URLs, remote documents keep their `http(s)://` URL. References
//! are joined against the URL of the document they appear in, so relative
//! paths inside an external file resolve next to that file.

use std::path::Path;

use url::Url;

use crate::error::{DerefError, LoadError};
use crate::pointer::parse_pointer;

/// Canonical target of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Document URL without fragment.
    pub document: Url,
    /// Unescaped pointer components within the document.
    pub pointer: Vec<String>,
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// The current working directory as a `file://` directory URL.
///
/// Used as the base location of in-memory documents that have none.
pub fn cwd_base() -> Result<Url, DerefError> {
    let cwd = std::env::current_dir().map_err(|source| DerefError::LoadFailure {
        location: ".".to_string(),
        source: LoadError::Io(source),
    })?;
    Url::from_directory_path(&cwd).map_err(|()| DerefError::InvalidReference {
        reference: cwd.display().to_string(),
        message: "working directory is not an absolute path".to_string(),
    })
}

/// Base location for a root given as a file path or http(s) URL.
pub fn source_base(source: &str) -> Result<Url, DerefError> {
    if is_url(source) {
        return Url::parse(source).map_err(|e| DerefError::InvalidReference {
            reference: source.to_string(),
            message: e.to_string(),
        });
    }
    path_base(Path::new(source))
}

/// Base location for a root given as a file path.
pub fn path_base(path: &Path) -> Result<Url, DerefError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| DerefError::LoadFailure {
            location: path.display().to_string(),
            source: LoadError::Io(source),
        })?;
        cwd.join(path)
    };
    // Missing files keep their spelled path so the load error can name it
    let absolute = absolute.canonicalize().unwrap_or(absolute);

    Url::from_file_path(&absolute).map_err(|()| DerefError::InvalidReference {
        reference: path.display().to_string(),
        message: "cannot convert path to a file URL".to_string(),
    })
}

/// Resolve `reference` against the location of the document containing it.
///
/// # Errors
///
/// Returns `DerefError::InvalidReference` if the reference is not a valid
/// URI reference or its fragment is not a JSON Pointer.
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Target, DerefError> {
    let mut joined = base.join(reference).map_err(|e| DerefError::InvalidReference {
        reference: reference.to_string(),
        message: e.to_string(),
    })?;

    let fragment = joined.fragment().unwrap_or("").to_string();
    joined.set_fragment(None);

    let decoded = urlencoding::decode(&fragment).map_err(|e| DerefError::InvalidReference {
        reference: reference.to_string(),
        message: e.to_string(),
    })?;
    let pointer = parse_pointer(&decoded).ok_or_else(|| DerefError::InvalidReference {
        reference: reference.to_string(),
        message: format!("fragment \"#{}\" is not a JSON Pointer", decoded),
    })?;

    Ok(Target {
        document: joined,
        pointer,
    })
}

/// Human-readable form of a location: file URLs as paths, others as URLs.
pub fn display_location(url: &Url) -> String {
    if url.scheme() == "file" {
        if let Ok(path) = url.to_file_path() {
            return path.display().to_string();
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("file:///schemas/main.json").unwrap()
    }

    #[test]
    fn is_url_https() {
        assert!(is_url("https://example.com/schema.json"));
    }

    #[test]
    fn is_url_http() {
        assert!(is_url("http://example.com/schema.json"));
    }

    #[test]
    fn is_url_file_path() {
        assert!(!is_url("/path/to/schema.json"));
        assert!(!is_url("./schema.json"));
        assert!(!is_url("schema.json"));
    }

    #[test]
    fn local_fragment_stays_in_document() {
        let target = resolve_reference(&base(), "#/definitions/A").unwrap();
        assert_eq!(target.document, base());
        assert_eq!(target.pointer, vec!["definitions", "A"]);
    }

    #[test]
    fn bare_hash_is_document_root() {
        let target = resolve_reference(&base(), "#").unwrap();
        assert_eq!(target.document, base());
        assert!(target.pointer.is_empty());
    }

    #[test]
    fn relative_file_with_fragment() {
        let target = resolve_reference(&base(), "types/buyer.json#/$defs/buyer").unwrap();
        assert_eq!(target.document.as_str(), "file:///schemas/types/buyer.json");
        assert_eq!(target.pointer, vec!["$defs", "buyer"]);
    }

    #[test]
    fn parent_directory_is_normalized() {
        let base = Url::parse("file:///schemas/nested/a.json").unwrap();
        let target = resolve_reference(&base, "../common.json").unwrap();
        assert_eq!(target.document.as_str(), "file:///schemas/common.json");
        assert!(target.pointer.is_empty());
    }

    #[test]
    fn absolute_url_ignores_base() {
        let target =
            resolve_reference(&base(), "https://example.com/s/pet.json#/properties/name").unwrap();
        assert_eq!(target.document.as_str(), "https://example.com/s/pet.json");
        assert_eq!(target.pointer, vec!["properties", "name"]);
    }

    #[test]
    fn relative_to_remote_document() {
        let base = Url::parse("https://example.com/s/pet.json").unwrap();
        let target = resolve_reference(&base, "owner.json").unwrap();
        assert_eq!(target.document.as_str(), "https://example.com/s/owner.json");
    }

    #[test]
    fn percent_encoded_fragment_is_decoded() {
        let target = resolve_reference(&base(), "#/definitions/my%20type").unwrap();
        assert_eq!(target.pointer, vec!["definitions", "my type"]);
    }

    #[test]
    fn escaped_slash_in_fragment() {
        let target = resolve_reference(&base(), "#/paths/~1users").unwrap();
        assert_eq!(target.pointer, vec!["paths", "/users"]);
    }

    #[test]
    fn plain_name_fragment_is_rejected() {
        let result = resolve_reference(&base(), "#anchor");
        assert!(matches!(result, Err(DerefError::InvalidReference { .. })));
    }

    #[test]
    fn display_file_location_as_path() {
        let url = Url::parse("file:///schemas/missing.json").unwrap();
        assert_eq!(display_location(&url), "/schemas/missing.json");
    }

    #[test]
    fn display_remote_location_as_url() {
        let url = Url::parse("https://example.com/a.json").unwrap();
        assert_eq!(display_location(&url), "https://example.com/a.json");
    }

    #[test]
    fn source_base_for_relative_path() {
        let url = source_base("does-not-exist.json").unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/does-not-exist.json"));
    }

    #[test]
    fn source_base_for_url() {
        let url = source_base("https://example.com/root.json").unwrap();
        assert_eq!(url.as_str(), "https://example.com/root.json");
    }

    #[test]
    fn cwd_base_is_directory() {
        let url = cwd_base().unwrap();
        assert!(url.path().ends_with('/'));
    }
}
