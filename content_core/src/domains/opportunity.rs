//! Situational opportunities offered to the player.
//!
//! Counting and previewing are peeks. Presenting a card commits it and counts
//! it as shown; the player's reaction feeds the engagement counters that
//! scale future weights.

use game_state::{Context, GameTime};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::CatalogHandle;
use crate::error::CommitError;
use crate::node::{ContentNode, Domain};
use crate::selector::{Pool, Selection, SelectionPolicy, Selector, TieBreak};

#[derive(Debug)]
pub struct OpportunityBoard {
    selector: Selector,
}

impl OpportunityBoard {
    /// Weighted draws with engagement and no pacing caps.
    pub fn default_policy() -> SelectionPolicy {
        SelectionPolicy {
            tie_break: TieBreak::WeightedRandom,
            use_engagement: true,
            ..SelectionPolicy::default()
        }
    }

    pub fn new(catalog: CatalogHandle, policy: SelectionPolicy) -> Self {
        Self {
            selector: Selector::new(catalog, policy).restricted_to(Domain::Opportunity),
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

    /// How many opportunities could be offered right now.
    pub fn available_count(&self, context: &Context, now: GameTime) -> usize {
        self.available(context, now).len()
    }

    pub fn available(&self, context: &Context, now: GameTime) -> Vec<Arc<ContentNode>> {
        self.selector.eligible(Pool::All, context, now)
    }

    /// The opportunity that would be offered next.
    pub fn next(&self, context: &Context, now: GameTime) -> Option<Selection> {
        self.selector.select_any(context, now)
    }

    pub fn next_in_category(
        &self,
        category: &str,
        context: &Context,
        now: GameTime,
    ) -> Option<Selection> {
        self.selector.select_in_category(category, context, now)
    }

    /// Put `node` in front of the player.
    pub fn present(&mut self, node: &ContentNode, now: GameTime) -> Result<(), CommitError> {
        self.selector.commit(node, now)?;
        self.selector.record_shown(node);
        debug!(id = %node.id, category = %node.category, "opportunity presented");
        Ok(())
    }

    /// The player took the opportunity.
    pub fn engage(&mut self, node: &ContentNode) {
        self.selector.record_engaged(node);
    }

    /// The player let it pass.
    pub fn ignore(&mut self, node: &ContentNode) {
        self.selector.record_ignored(node);
    }
}
