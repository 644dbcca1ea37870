//! World-state driven events.
//!
//! The monitor snapshots the world into a [`Context`] once per poll; event
//! predicates and `requires` gates are both checked against that snapshot.

use game_state::{Context, WorldState};
use std::sync::Arc;
use tracing::info;

use crate::catalog::CatalogHandle;
use crate::error::CommitError;
use crate::node::{ContentNode, Domain};
use crate::selector::{Pool, Selection, SelectionPolicy, Selector};

#[derive(Debug)]
pub struct WorldEventMonitor {
    selector: Selector,
}

impl WorldEventMonitor {
    pub fn new(catalog: CatalogHandle, policy: SelectionPolicy) -> Self {
        Self {
            selector: Selector::new(catalog, policy).restricted_to(Domain::WorldEvent),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.selector = self.selector.with_seed(seed);
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    pub fn context_for(world: &WorldState) -> Context {
        world.to_context()
    }

    /// The event that should fire now, if any.
    pub fn poll(&self, world: &WorldState) -> Option<Selection> {
        self.selector.select_any(&Self::context_for(world), world.time)
    }

    /// Like [`poll`](Self::poll), limited to one event group.
    pub fn poll_group(&self, group: &str, world: &WorldState) -> Option<Selection> {
        self.selector.select(group, &Self::context_for(world), world.time)
    }

    /// Every event currently eligible, best first.
    pub fn pending(&self, world: &WorldState) -> Vec<Arc<ContentNode>> {
        self.selector
            .eligible(Pool::All, &Self::context_for(world), world.time)
    }

    /// Record that `event` fired at the world's current time.
    pub fn fire(&mut self, event: &ContentNode, world: &WorldState) -> Result<(), CommitError> {
        self.selector.commit(event, world.time)?;
        info!(id = %event.id, at = %world.time, "world event fired");
        Ok(())
    }
}
