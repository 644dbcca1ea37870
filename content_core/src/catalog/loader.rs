//! Catalog loading from JSON and TOML content files.
//!
//! One bad file never stops the others, and one bad node never stops its
//! file. Every rejection is logged and kept in the [`LoadReport`].

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{Catalog, CatalogBuilder};
use crate::error::{AmbiguousVariantError, LoadError, NodeValidationError};
use crate::node::{ContentNode, Domain};

/// The only catalog schema this build understands.
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Serialization format of a content file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Format::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(Format::Toml),
            _ => None,
        }
    }
}

/// Why a node was left out of the catalog.
#[derive(Debug)]
pub enum SkipReason {
    Invalid(NodeValidationError),
    Ambiguous(AmbiguousVariantError),
    /// The payload belongs to another domain than the loader accepts.
    WrongDomain { id: String, found: Domain, expected: Domain },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Invalid(e) => write!(f, "{}", e),
            SkipReason::Ambiguous(e) => write!(f, "{}", e),
            SkipReason::WrongDomain { id, found, expected } => {
                write!(f, "node '{}' is {} content, expected {}", id, found, expected)
            }
        }
    }
}

#[derive(Debug)]
pub struct SkippedNode {
    pub origin: String,
    /// Position of the node within its file.
    pub index: usize,
    pub reason: SkipReason,
}

/// Outcome of a load: what made it in and what did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub files_loaded: usize,
    pub nodes_loaded: usize,
    pub rejected_files: Vec<LoadError>,
    pub skipped_nodes: Vec<SkippedNode>,
}

impl LoadReport {
    /// True when nothing was rejected or skipped.
    pub fn is_clean(&self) -> bool {
        self.rejected_files.is_empty() && self.skipped_nodes.is_empty()
    }
}

/// Loads content files into a single catalog, in the order they are given.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    builder: CatalogBuilder,
    report: LoadReport,
    domain: Option<Domain>,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept nodes whose payload belongs to `domain`.
    pub fn for_domain(domain: Domain) -> Self {
        Self {
            domain: Some(domain),
            ..Self::default()
        }
    }

    /// Load a file, or every content file in a directory.
    pub fn load(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if path.is_dir() {
            self.load_dir(path)
        } else {
            self.load_path(path)
        }
    }

    /// Load one file; its format comes from the extension.
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let Some(format) = Format::from_path(path) else {
            self.reject(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
            return self;
        };

        match std::fs::read_to_string(path) {
            Ok(text) => self.load_str(&origin, format, &text),
            Err(source) => {
                self.reject(LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
                self
            }
        }
    }

    /// Load every `.json` and `.toml` file in `dir`, sorted by file name so
    /// registration order does not depend on the filesystem.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        let dir = dir.as_ref();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                self.reject(LoadError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
                return self;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Format::from_path(p).is_some())
            .collect();
        paths.sort();

        debug!(dir = %dir.display(), files = paths.len(), "loading catalog directory");
        for path in paths {
            self.load_path(path);
        }
        self
    }

    /// Load content from text already in memory. `origin` names it in logs.
    pub fn load_str(&mut self, origin: &str, format: Format, text: &str) -> &mut Self {
        match parse_document(origin, format, text) {
            Ok(nodes) => self.load_nodes(origin, nodes),
            Err(e) => self.reject(e),
        }
        self
    }

    fn load_nodes(&mut self, origin: &str, nodes: Vec<Value>) {
        let mut loaded = 0;
        let mut skipped = 0;

        let expected = self.domain;
        for (index, raw) in nodes.into_iter().enumerate() {
            let result = ContentNode::from_config(raw)
                .map_err(SkipReason::Invalid)
                .and_then(|node| match expected {
                    Some(expected) if node.payload.domain() != expected => {
                        Err(SkipReason::WrongDomain {
                            found: node.payload.domain(),
                            id: node.id,
                            expected,
                        })
                    }
                    _ => Ok(node),
                })
                .and_then(|node| self.builder.insert(node).map_err(SkipReason::Ambiguous));

            match result {
                Ok(()) => loaded += 1,
                Err(reason) => {
                    warn!(origin, index, reason = %reason, "content node skipped");
                    skipped += 1;
                    self.report.skipped_nodes.push(SkippedNode {
                        origin: origin.to_string(),
                        index,
                        reason,
                    });
                }
            }
        }

        info!(origin, nodes = loaded, skipped, "catalog file loaded");
        self.report.files_loaded += 1;
        self.report.nodes_loaded += loaded;
    }

    fn reject(&mut self, error: LoadError) {
        warn!(error = %error, "catalog file rejected");
        self.report.rejected_files.push(error);
    }

    /// Freeze the catalog.
    pub fn finish(self) -> (Catalog, LoadReport) {
        let catalog = self.builder.build();
        info!(
            version = %catalog.version(),
            nodes = catalog.len(),
            files = self.report.files_loaded,
            rejected_files = self.report.rejected_files.len(),
            skipped_nodes = self.report.skipped_nodes.len(),
            "catalog built"
        );
        (catalog, self.report)
    }
}

impl Catalog {
    /// Load a catalog from files, in order.
    pub fn load_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> (Catalog, LoadReport) {
        let mut loader = CatalogLoader::new();
        for path in paths {
            loader.load_path(path);
        }
        loader.finish()
    }
}

/// Parse a file, check its schema version and return its raw nodes.
fn parse_document(origin: &str, format: Format, text: &str) -> Result<Vec<Value>, LoadError> {
    let root: Value = match format {
        Format::Json => serde_json::from_str(text).map_err(|source| LoadError::Json {
            origin: origin.to_string(),
            source,
        })?,
        Format::Toml => toml::from_str(text).map_err(|source| LoadError::Toml {
            origin: origin.to_string(),
            source,
        })?,
    };

    let Value::Object(mut root) = root else {
        return Err(LoadError::Malformed {
            origin: origin.to_string(),
            reason: "top level must be a table".to_string(),
        });
    };

    let version = root
        .get("schema_version")
        .ok_or_else(|| LoadError::MissingSchemaVersion {
            origin: origin.to_string(),
        })?;
    let version = version.as_i64().ok_or_else(|| LoadError::Malformed {
        origin: origin.to_string(),
        reason: format!("schema_version {} is not an integer", version),
    })?;
    if version != SUPPORTED_SCHEMA_VERSION as i64 {
        return Err(LoadError::UnsupportedSchema {
            origin: origin.to_string(),
            found: version,
            supported: SUPPORTED_SCHEMA_VERSION,
        });
    }

    match root.remove("nodes") {
        None => Ok(Vec::new()),
        Some(Value::Array(nodes)) => Ok(nodes),
        Some(_) => Err(LoadError::Malformed {
            origin: origin.to_string(),
            reason: "'nodes' must be a list".to_string(),
        }),
    }
}
