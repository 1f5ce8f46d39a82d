//! Document loading from files and HTTP URLs.
//!
//! The [`Loader`] trait is the seam the dereferencer fetches external
//! documents through. [`DefaultLoader`] reads `file://` locations from disk
//! and, with the `remote` feature, fetches `http(s)://` locations.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{DerefError, LoadError};

/// Fetches the raw text of a document.
pub trait Loader {
    /// Load the document at `location` (a URL without fragment).
    ///
    /// `timeout` is the time left for this load; remote loaders must honour it.
    fn load(&self, location: &Url, timeout: Duration) -> Result<String, LoadError>;
}

impl<L: Loader + ?Sized> Loader for &L {
    fn load(&self, location: &Url, timeout: Duration) -> Result<String, LoadError> {
        (**self).load(location, timeout)
    }
}

/// Loader for local files and, with the `remote` feature, HTTP URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoader;

impl Loader for DefaultLoader {
    fn load(&self, location: &Url, timeout: Duration) -> Result<String, LoadError> {
        match location.scheme() {
            "file" => {
                let path = location.to_file_path().map_err(|()| LoadError::NotLocalPath)?;
                read_file(&path)
            }
            #[cfg(feature = "remote")]
            "http" | "https" => fetch_url(location.as_str(), timeout),
            other => {
                let _ = timeout;
                Err(LoadError::UnsupportedScheme(other.to_string()))
            }
        }
    }
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound);
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(feature = "remote")]
fn fetch_url(url: &str, timeout: Duration) -> Result<String, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;

    let response = client.get(url).send().map_err(|e| timeout_or(e, timeout))?;

    // Check for HTTP errors before reading the body
    let response = response.error_for_status()?;

    response.text().map_err(|e| timeout_or(e, timeout))
}

#[cfg(feature = "remote")]
fn timeout_or(err: reqwest::Error, timeout: Duration) -> LoadError {
    if err.is_timeout() {
        LoadError::TimedOut(timeout)
    } else {
        LoadError::Network(err)
    }
}

/// Parse document text, attributing failures to `location`.
pub(crate) fn parse_document(content: &str, location: &str) -> Result<Value, DerefError> {
    serde_json::from_str(content).map_err(|source| DerefError::ParseFailure {
        location: location.to_string(),
        source,
    })
}
