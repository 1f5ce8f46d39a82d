//! Schema dereferencing - replaces `$ref` nodes with the content they point to.
//!
//! A call walks the root document depth-first and expands every reference
//! node in place, loading external documents through a [`Loader`]. Each
//! external document is loaded at most once per call.
//!
//! The walk keeps a chain of segments, one per reference expansion currently
//! in progress (the root document is the first segment). A segment records
//! which document and pointer it started from and how long the output path
//! was at that point, so every node on the current path has a known source
//! location and output location. A reference whose target is one of those
//! nodes is circular.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::error::{DepthLimit, DerefError};
use crate::loader::{parse_document, DefaultLoader, Loader};
use crate::location::{
    cwd_base, display_location, path_base, resolve_reference, source_base, Target,
};
use crate::pointer::{format_pointer, navigate};
use crate::types::{json_type_name, CircularPolicy, DerefOptions, REF_KEY};

/// Dereference an in-memory schema with the default loader.
///
/// Relative external references resolve against the current directory.
///
/// # Errors
///
/// Returns the first `DerefError` encountered; no partial result is produced.
pub fn dereference(schema: &Value, options: &DerefOptions) -> Result<Value, DerefError> {
    Dereferencer::new(options.clone()).dereference_document(schema, None)
}

/// Load a schema from a file path or URL and dereference it with the default loader.
pub fn dereference_source(source: &str, options: &DerefOptions) -> Result<Value, DerefError> {
    Dereferencer::new(options.clone()).dereference_source(source)
}

/// Resolves `$ref` pointers using a pluggable [`Loader`].
#[derive(Debug, Clone)]
pub struct Dereferencer<L = DefaultLoader> {
    loader: L,
    options: DerefOptions,
}

impl Dereferencer<DefaultLoader> {
    /// Create a dereferencer that reads files and (with `remote`) HTTP URLs.
    pub fn new(options: DerefOptions) -> Self {
        Self::with_loader(DefaultLoader, options)
    }
}

impl<L: Loader> Dereferencer<L> {
    /// Create a dereferencer with a custom loader.
    pub fn with_loader(loader: L, options: DerefOptions) -> Self {
        Self { loader, options }
    }

    pub fn options(&self) -> &DerefOptions {
        &self.options
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Load the root from a file path or http(s) URL and dereference it.
    pub fn dereference_source(&self, source: &str) -> Result<Value, DerefError> {
        let base = source_base(source)?;
        self.dereference_location(&base)
    }

    /// Load the root from a file path and dereference it.
    pub fn dereference_file(&self, path: &Path) -> Result<Value, DerefError> {
        let base = path_base(path)?;
        self.dereference_location(&base)
    }

    /// Load the root from `location` and dereference it.
    pub fn dereference_location(&self, location: &Url) -> Result<Value, DerefError> {
        let mut location = location.clone();
        location.set_fragment(None);

        let mut run = Run::new(&self.loader, &self.options);
        let root = run.document(&location)?;
        run.finish(root)
    }

    /// Dereference an already-parsed root document.
    ///
    /// `base` is the location the document was read from. When `None`, the
    /// current directory is used so relative file references still resolve.
    /// The input is never modified.
    pub fn dereference_document(
        &self,
        document: &Value,
        base: Option<&Url>,
    ) -> Result<Value, DerefError> {
        let mut base = match base {
            Some(url) => url.clone(),
            None => cwd_base()?,
        };
        base.set_fragment(None);

        let mut run = Run::new(&self.loader, &self.options);
        let root = run.register(base, document.clone());
        run.finish(root)
    }
}

/// A loaded document, shared between the cache and the chain.
#[derive(Debug, Clone)]
struct Document {
    url: Rc<Url>,
    value: Rc<Value>,
}

/// One reference expansion in progress.
#[derive(Debug)]
struct Segment {
    document: Rc<Url>,
    /// Pointer of the expanded target within `document`.
    base: Vec<String>,
    /// Length of the output path when the expansion started.
    out_len: usize,
}

/// State of a single dereference call.
struct Run<'a, L> {
    loader: &'a L,
    options: &'a DerefOptions,
    started: Instant,
    documents: HashMap<Url, Document>,
    chain: Vec<Segment>,
    /// Output path of the node being built.
    out: Vec<String>,
}

impl<'a, L: Loader> Run<'a, L> {
    fn new(loader: &'a L, options: &'a DerefOptions) -> Self {
        Self {
            loader,
            options,
            started: Instant::now(),
            documents: HashMap::new(),
            chain: Vec::new(),
            out: Vec::new(),
        }
    }

    fn register(&mut self, url: Url, value: Value) -> Document {
        let document = Document {
            url: Rc::new(url.clone()),
            value: Rc::new(value),
        };
        self.documents.insert(url, document.clone());
        document
    }

    /// Return the document at `url`, loading it on first use.
    fn document(&mut self, url: &Url) -> Result<Document, DerefError> {
        if let Some(document) = self.documents.get(url) {
            trace!(location = %url, "document cache hit");
            return Ok(document.clone());
        }

        let location = display_location(url);
        let timeout = self.load_timeout(&location)?;
        debug!(
            location = %location,
            timeout_ms = timeout.as_millis() as u64,
            "loading document"
        );

        let text = self.loader.load(url, timeout).map_err(|source| {
            if self.deadline_passed() {
                DerefError::DeadlineExceeded {
                    location: location.clone(),
                    deadline: self.options.deadline.unwrap_or_default(),
                }
            } else {
                DerefError::LoadFailure {
                    location: location.clone(),
                    source,
                }
            }
        })?;
        let value = parse_document(&text, &location)?;

        Ok(self.register(url.clone(), value))
    }

    /// Timeout for the next load: the loader timeout, capped by what is left
    /// of the call deadline.
    fn load_timeout(&self, location: &str) -> Result<Duration, DerefError> {
        let Some(deadline) = self.options.deadline else {
            return Ok(self.options.loader_timeout);
        };
        match deadline.checked_sub(self.started.elapsed()) {
            Some(remaining) if !remaining.is_zero() => Ok(remaining.min(self.options.loader_timeout)),
            _ => Err(DerefError::DeadlineExceeded {
                location: location.to_string(),
                deadline,
            }),
        }
    }

    fn deadline_passed(&self) -> bool {
        self.options
            .deadline
            .map(|deadline| self.started.elapsed() >= deadline)
            .unwrap_or(false)
    }

    /// Expand the root document and return the result.
    fn finish(mut self, root: Document) -> Result<Value, DerefError> {
        self.chain.push(Segment {
            document: root.url.clone(),
            base: Vec::new(),
            out_len: 0,
        });
        let result = self.walk(&root.value)?;
        debug!(
            documents = self.documents.len(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "dereference complete"
        );
        Ok(result)
    }

    fn walk(&mut self, value: &Value) -> Result<Value, DerefError> {
        match value {
            Value::Object(map) => {
                match map.get(REF_KEY) {
                    Some(Value::String(reference)) => return self.expand(reference, map),
                    Some(other) => {
                        trace!(kind = json_type_name(other), "ignoring non-string $ref");
                    }
                    None => {}
                }
                Ok(Value::Object(self.walk_members(map, false)?))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.out.push(index.to_string());
                    let resolved = self.walk(item);
                    self.out.pop();
                    out.push(resolved?);
                }
                Ok(Value::Array(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn walk_members(
        &mut self,
        map: &Map<String, Value>,
        skip_ref: bool,
    ) -> Result<Map<String, Value>, DerefError> {
        let mut out = Map::with_capacity(map.len());
        for (key, child) in map {
            if skip_ref && key == REF_KEY {
                continue;
            }
            self.out.push(key.clone());
            let resolved = self.walk(child);
            self.out.pop();
            out.insert(key.clone(), resolved?);
        }
        Ok(out)
    }

    /// Replace the reference node `node` with its resolved target.
    fn expand(&mut self, reference: &str, node: &Map<String, Value>) -> Result<Value, DerefError> {
        let current = self.segment().document.clone();
        let target = resolve_reference(&current, reference)?;
        trace!(reference, target = %target.document, "resolving reference");

        if let Some(cycle_at) = self.find_cycle(&target) {
            match self.options.circular {
                CircularPolicy::Error => {
                    return Err(DerefError::CircularReference {
                        reference: reference.to_string(),
                        location: self.here(),
                    });
                }
                CircularPolicy::PreserveAsMarker => {
                    let marker = format!("#{}", format_pointer(&self.out[..cycle_at]));
                    debug!(reference, marker = %marker, "circular reference preserved");
                    let mut out = Map::new();
                    out.insert(REF_KEY.to_string(), Value::String(marker));
                    return Ok(Value::Object(out));
                }
                CircularPolicy::Inline => {
                    debug!(reference, "circular reference inlined");
                }
            }
        }

        // The root segment is not an expansion
        let limit = if self.chain.len() > self.options.max_depth {
            Some(DepthLimit::References(self.options.max_depth))
        } else if self.out.len() >= self.options.max_nesting {
            Some(DepthLimit::Nesting(self.options.max_nesting))
        } else {
            None
        };
        if let Some(limit) = limit {
            return Err(DerefError::DepthExceeded {
                reference: reference.to_string(),
                limit,
            });
        }

        let document = self.document(&target.document)?;
        let resolved = navigate(&document.value, &target.pointer).ok_or_else(|| {
            DerefError::UnresolvableReference {
                reference: reference.to_string(),
                location: display_location(&document.url),
                pointer: format_pointer(&target.pointer),
            }
        })?;

        self.chain.push(Segment {
            document: document.url.clone(),
            base: target.pointer,
            out_len: self.out.len(),
        });
        let expanded = self.walk(resolved);
        self.chain.pop();
        let expanded = expanded?;

        if node.len() == 1 {
            return Ok(expanded);
        }

        // Siblings of $ref override the target's keys when both are objects
        match expanded {
            Value::Object(target_map) => {
                let mut merged = self.walk_members(node, true)?;
                for (key, value) in target_map {
                    merged.entry(key).or_insert(value);
                }
                Ok(Value::Object(merged))
            }
            other => Ok(other),
        }
    }

    /// The innermost segment. The root segment is pushed before walking starts.
    fn segment(&self) -> &Segment {
        &self.chain[self.chain.len() - 1]
    }

    /// Find a node on the current path that `target` addresses.
    ///
    /// Returns the length of that node's output path.
    fn find_cycle(&self, target: &Target) -> Option<usize> {
        for (index, segment) in self.chain.iter().enumerate() {
            if *segment.document != target.document {
                continue;
            }
            let Some(rest) = target.pointer.strip_prefix(segment.base.as_slice()) else {
                continue;
            };
            let end = self
                .chain
                .get(index + 1)
                .map(|next| next.out_len)
                .unwrap_or(self.out.len());
            let walked = &self.out[segment.out_len..end];
            if rest.len() <= walked.len() && walked[..rest.len()] == *rest {
                return Some(segment.out_len + rest.len());
            }
        }
        None
    }

    /// Source location of the node being visited, for error messages.
    fn here(&self) -> String {
        let segment = self.segment();
        let mut pointer = segment.base.clone();
        pointer.extend(self.out[segment.out_len..].iter().cloned());
        format!(
            "{}#{}",
            display_location(&segment.document),
            format_pointer(&pointer)
        )
    }
}
