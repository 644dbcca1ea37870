//! Content catalog - the read-only table of authored nodes.
//!
//! A catalog is built once and never modified. Hot reload builds a new one
//! and swaps it into a [`CatalogHandle`]; selections already holding a
//! snapshot keep using the table they started with.

mod loader;

pub use loader::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::AmbiguousVariantError;
use crate::node::ContentNode;

/// Identifies one catalog build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogVersion(pub Uuid);

impl CatalogVersion {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CatalogVersion {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The immutable node table, indexed by group and by category.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: CatalogVersion,
    nodes: Vec<Arc<ContentNode>>,
    groups: HashMap<String, Vec<Arc<ContentNode>>>,
    categories: HashMap<String, Vec<Arc<ContentNode>>>,
}

impl Catalog {
    /// A catalog with no content.
    pub fn empty() -> Self {
        CatalogBuilder::new().build()
    }

    /// Build from nodes in registration order. Ambiguous variants are skipped
    /// and returned.
    pub fn from_nodes(
        nodes: impl IntoIterator<Item = ContentNode>,
    ) -> (Self, Vec<AmbiguousVariantError>) {
        let mut builder = CatalogBuilder::new();
        let rejected = nodes
            .into_iter()
            .filter_map(|node| builder.insert(node).err())
            .collect();
        (builder.build(), rejected)
    }

    pub fn version(&self) -> CatalogVersion {
        self.version
    }

    /// Variants sharing `group`, in registration order.
    pub fn get_group(&self, group: &str) -> &[Arc<ContentNode>] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes in `category`, in registration order.
    pub fn get_by_category(&self, category: &str) -> &[Arc<ContentNode>] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node, in registration order.
    pub fn nodes(&self) -> &[Arc<ContentNode>] {
        &self.nodes
    }

    /// Look up a node by id. Returns the first-registered variant.
    pub fn find(&self, id: &str) -> Option<&Arc<ContentNode>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

/// Accumulates nodes, rejecting ambiguous variants.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    nodes: Vec<Arc<ContentNode>>,
    groups: HashMap<String, Vec<Arc<ContentNode>>>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` after every node inserted before it.
    ///
    /// Fails if its group already holds a node with an identical predicate
    /// set; the earlier node is kept.
    pub fn insert(&mut self, mut node: ContentNode) -> Result<(), AmbiguousVariantError> {
        let group = self.groups.entry(node.group.clone()).or_default();
        if group.iter().any(|existing| existing.predicates == node.predicates) {
            return Err(AmbiguousVariantError {
                group: node.group.clone(),
                id: node.id.clone(),
            });
        }

        node.set_order(self.nodes.len());
        let node = Arc::new(node);
        group.push(Arc::clone(&node));
        self.nodes.push(node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn build(self) -> Catalog {
        let mut categories: HashMap<String, Vec<Arc<ContentNode>>> = HashMap::new();
        for node in &self.nodes {
            categories
                .entry(node.category.clone())
                .or_default()
                .push(Arc::clone(node));
        }

        Catalog {
            version: CatalogVersion::new(),
            nodes: self.nodes,
            groups: self.groups,
            categories,
        }
    }
}

/// Shared, swappable pointer to the current catalog.
#[derive(Debug, Clone)]
pub struct CatalogHandle {
    current: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// The catalog as of now. Later swaps do not affect the returned table.
    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Atomically replace the whole table, returning the previous one.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        tracing::info!(
            from = %guard.version(),
            to = %next.version(),
            nodes = next.len(),
            "catalog swapped"
        );
        std::mem::replace(&mut *guard, next)
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(Catalog::empty())
    }
}
