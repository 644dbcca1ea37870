//! Conversation variant resolution.
//!
//! A line id names a group of variants. Resolving it is a peek: menus are
//! often rebuilt many times before the player picks anything, so only
//! [`DialogueResolver::mark_spoken`] records a firing.

use game_state::{Context, GameTime};
use std::sync::Arc;

use crate::catalog::CatalogHandle;
use crate::error::CommitError;
use crate::node::{ContentNode, ContentOption, DialogueLine, Domain};
use crate::selector::{SelectionPolicy, Selector, TieBreak};

/// The variant chosen for a line.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub node: Arc<ContentNode>,
    pub specificity: usize,
}

impl ResolvedLine {
    pub fn line(&self) -> Option<&DialogueLine> {
        self.node.payload.as_dialogue()
    }

    /// Localization key of the chosen variant.
    pub fn text_id(&self) -> &str {
        self.line().map_or("", |l| l.text_id.as_str())
    }
}

#[derive(Debug)]
pub struct DialogueResolver {
    selector: Selector,
}

impl DialogueResolver {
    /// Unlimited pacing, no cooldowns and registration-order ties.
    pub fn default_policy() -> SelectionPolicy {
        SelectionPolicy {
            tie_break: TieBreak::Registration,
            ..SelectionPolicy::default()
        }
    }

    pub fn new(catalog: CatalogHandle) -> Self {
        Self::with_policy(catalog, Self::default_policy())
    }

    pub fn with_policy(catalog: CatalogHandle, policy: SelectionPolicy) -> Self {
        Self {
            selector: Selector::new(catalog, policy).restricted_to(Domain::Dialogue),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    /// Best variant of `line_id` for `context`.
    pub fn resolve(&self, line_id: &str, context: &Context, now: GameTime) -> Option<ResolvedLine> {
        self.selector
            .select(line_id, context, now)
            .map(|s| ResolvedLine {
                node: s.node,
                specificity: s.specificity,
            })
    }

    /// Menu options of `line` whose gates pass in `context`.
    pub fn options<'a>(&self, line: &'a ResolvedLine, context: &Context) -> Vec<&'a ContentOption> {
        line.node.available_options(context)
    }

    /// Record that the conversation actually reached `line`.
    pub fn mark_spoken(&mut self, line: &ResolvedLine, now: GameTime) -> Result<(), CommitError> {
        self.selector.commit(&line.node, now)
    }
}
