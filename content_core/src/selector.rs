//! Selector - picks the best-fitting eligible node from a pool.
//!
//! # Algorithm
//!
//! 1. Refuse everything if the pacing limiter would not allow a firing now
//! 2. Keep nodes whose predicates and trigger gates hold in the context
//! 3. Drop nodes whose item or category key is still cooling down
//! 4. Rank the rest by specificity, most specific first
//! 5. Break ties inside the top tier by weight (see [`TieBreak`])
//!
//! `select` and friends never touch the ledger, the pacing counters or the
//! engagement counters. Only `commit` and the `record_*` calls do.

use game_state::{Context, GameDuration, GameTime};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::catalog::{Catalog, CatalogHandle, CatalogVersion};
use crate::cooldown::{CooldownKey, CooldownLedger};
use crate::engagement::{EngagementConfig, EngagementTracker};
use crate::error::{CommitError, PersistError};
use crate::node::{ContentNode, CooldownScope, Domain};
use crate::pacing::{PacingLimiter, PacingPolicy};
use crate::persist::SelectorStateDto;

/// How to choose among equally specific candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Draw proportionally to effective weight. If every tied candidate has
    /// the same weight, the earliest-registered wins.
    #[default]
    WeightedRandom,
    /// Highest effective weight, then earliest registration. No randomness.
    Registration,
}

/// Everything a domain configures about selection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub pacing: PacingPolicy,
    pub tie_break: TieBreak,
    /// Scale weights by engagement for payloads that track it.
    pub use_engagement: bool,
    pub engagement: EngagementConfig,
}

/// Which nodes a selection considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool<'a> {
    /// Variants sharing a group id.
    Group(&'a str),
    Category(&'a str),
    /// The whole catalog.
    All,
}

impl<'a> Pool<'a> {
    fn candidates<'c>(&self, catalog: &'c Catalog) -> &'c [Arc<ContentNode>] {
        match self {
            Pool::Group(group) => catalog.get_group(group),
            Pool::Category(category) => catalog.get_by_category(category),
            Pool::All => catalog.nodes(),
        }
    }
}

impl std::fmt::Display for Pool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pool::Group(group) => write!(f, "group:{}", group),
            Pool::Category(category) => write!(f, "category:{}", category),
            Pool::All => f.write_str("all"),
        }
    }
}

/// A winning node and how it won.
#[derive(Debug, Clone)]
pub struct Selection {
    pub node: Arc<ContentNode>,
    pub specificity: usize,
    pub effective_weight: f64,
    /// The catalog snapshot the node came from.
    pub catalog_version: CatalogVersion,
}

/// Selection state for one domain: cooldowns, pacing and engagement, plus
/// the seed that makes weighted draws reproducible.
///
/// Each weighted draw seeds a fresh `R` from the selector seed, the pool,
/// the timestamp and the number of commits so far. Peeking twice with the
/// same state therefore returns the same winner, and a restored save keeps
/// drawing the same sequence.
#[derive(Debug)]
pub struct Selector<R = StdRng> {
    catalog: CatalogHandle,
    policy: SelectionPolicy,
    ledger: CooldownLedger,
    pacing: PacingLimiter,
    engagement: EngagementTracker,
    domain: Option<Domain>,
    seed: u64,
    commits: u64,
    rng: PhantomData<fn() -> R>,
}

/// Decoded save state, ready to swap in.
#[derive(Debug)]
pub(crate) struct RestoredState {
    ledger: CooldownLedger,
    pacing: PacingLimiter,
    engagement: EngagementTracker,
    commits: u64,
}

impl Selector<StdRng> {
    pub fn new(catalog: CatalogHandle, policy: SelectionPolicy) -> Self {
        Self::with_rng(catalog, policy)
    }
}

impl<R: SeedableRng + RngCore> Selector<R> {
    /// Create a selector drawing from a custom random source type.
    pub fn with_rng(catalog: CatalogHandle, policy: SelectionPolicy) -> Self {
        Self {
            catalog,
            policy,
            ledger: CooldownLedger::new(),
            pacing: PacingLimiter::new(),
            engagement: EngagementTracker::new(policy.engagement),
            domain: None,
            seed: 0,
            commits: 0,
            rng: PhantomData,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Ignore nodes whose payload belongs to another domain.
    pub fn restricted_to(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Change the policy; counters and cooldowns are kept.
    pub fn set_policy(&mut self, policy: SelectionPolicy) {
        self.policy = policy;
        self.engagement = EngagementTracker::from_counters(policy.engagement, &self.engagement);
    }

    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn pacing(&self) -> &PacingLimiter {
        &self.pacing
    }

    pub fn engagement(&self) -> &EngagementTracker {
        &self.engagement
    }

    /// Best variant of `group` for `context` at `now`, without committing it.
    pub fn select(&self, group: &str, context: &Context, now: GameTime) -> Option<Selection> {
        self.select_from(Pool::Group(group), context, now)
    }

    pub fn select_in_category(
        &self,
        category: &str,
        context: &Context,
        now: GameTime,
    ) -> Option<Selection> {
        self.select_from(Pool::Category(category), context, now)
    }

    pub fn select_any(&self, context: &Context, now: GameTime) -> Option<Selection> {
        self.select_from(Pool::All, context, now)
    }

    /// Best eligible node in `pool`, without committing it.
    pub fn select_from(&self, pool: Pool<'_>, context: &Context, now: GameTime) -> Option<Selection> {
        let catalog = self.catalog.snapshot();
        let eligible = self.rank(&catalog, pool, context, now);
        let selection = self.choose(&eligible, pool, now).map(|(node, weight)| Selection {
            specificity: node.specificity(),
            effective_weight: weight,
            node: Arc::clone(node),
            catalog_version: catalog.version(),
        });

        match &selection {
            Some(s) => debug!(
                pool = %pool,
                winner = %s.node.id,
                specificity = s.specificity,
                weight = s.effective_weight,
                candidates = eligible.len(),
                "content selected"
            ),
            None => debug!(pool = %pool, "no eligible content"),
        }
        selection
    }

    /// Every eligible node in `pool`, most specific first, then by
    /// registration order. Useful for "N available" counts.
    pub fn eligible(&self, pool: Pool<'_>, context: &Context, now: GameTime) -> Vec<Arc<ContentNode>> {
        let catalog = self.catalog.snapshot();
        self.rank(&catalog, pool, context, now)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whether `node` is blocked by its own cooldowns at `now`.
    pub fn is_cooling_down(&self, node: &ContentNode, now: GameTime) -> bool {
        let scope = node.cooldown_scope;
        (scope.includes_item()
            && self
                .ledger
                .is_cooling_down(&CooldownKey::item(&node.id), self.item_cooldown(node), now))
            || (scope.includes_category()
                && self.ledger.is_cooling_down(
                    &CooldownKey::category(&node.category),
                    self.category_cooldown(node),
                    now,
                ))
    }

    /// Whether pacing would allow a firing at `now`.
    pub fn can_fire(&self, now: GameTime) -> bool {
        self.pacing.can_fire(now, &self.policy.pacing)
    }

    fn item_cooldown(&self, node: &ContentNode) -> GameDuration {
        node.cooldown.unwrap_or(self.policy.pacing.per_item_cooldown)
    }

    fn category_cooldown(&self, node: &ContentNode) -> GameDuration {
        match node.cooldown_scope {
            CooldownScope::Category => node
                .cooldown
                .unwrap_or(self.policy.pacing.per_category_cooldown),
            _ => self.policy.pacing.per_category_cooldown,
        }
    }

    fn effective_weight(&self, node: &ContentNode) -> f64 {
        if self.policy.use_engagement && node.payload.kind().tracks_engagement() {
            self.engagement.effective_weight(node.base_weight, &node.category)
        } else {
            node.base_weight
        }
    }

    fn rank<'c>(
        &self,
        catalog: &'c Catalog,
        pool: Pool<'_>,
        context: &Context,
        now: GameTime,
    ) -> Vec<&'c Arc<ContentNode>> {
        if let Err(denial) = self.pacing.check(now, &self.policy.pacing) {
            trace!(pool = %pool, ?denial, "pacing gate closed");
            return Vec::new();
        }

        let mut eligible: Vec<&Arc<ContentNode>> = pool
            .candidates(catalog)
            .iter()
            .filter(|node| {
                if self.domain.is_some_and(|d| node.payload.domain() != d) {
                    return false;
                }
                if !node.is_applicable(context) {
                    trace!(id = %node.id, "predicates do not match");
                    return false;
                }
                if self.is_cooling_down(node, now) {
                    trace!(id = %node.id, "cooling down");
                    return false;
                }
                true
            })
            .collect();

        eligible.sort_by(|a, b| {
            b.specificity()
                .cmp(&a.specificity())
                .then(a.order().cmp(&b.order()))
        });
        eligible
    }

    fn choose<'c>(
        &self,
        ranked: &[&'c Arc<ContentNode>],
        pool: Pool<'_>,
        now: GameTime,
    ) -> Option<(&'c Arc<ContentNode>, f64)> {
        let top = ranked.first()?.specificity();
        let tier: Vec<(&'c Arc<ContentNode>, f64)> = ranked
            .iter()
            .take_while(|node| node.specificity() == top)
            .map(|node| (*node, self.effective_weight(node)))
            .collect();

        if tier.len() == 1 {
            return tier.into_iter().next();
        }

        match self.policy.tie_break {
            TieBreak::Registration => heaviest_first_registered(&tier),
            TieBreak::WeightedRandom => {
                let first_weight = tier[0].1;
                if tier.iter().all(|(_, w)| (w - first_weight).abs() < f64::EPSILON) {
                    return tier.into_iter().next();
                }
                let mut rng = R::seed_from_u64(self.draw_seed(pool, now));
                weighted_pick(&tier, &mut rng).or_else(|| heaviest_first_registered(&tier))
            }
        }
    }

    fn draw_seed(&self, pool: Pool<'_>, now: GameTime) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in pool.to_string().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        let mut seed = splitmix(self.seed ^ hash);
        seed = splitmix(seed ^ now.minutes());
        splitmix(seed ^ self.commits)
    }

    /// Record that `node` was actually presented or consumed at `now`.
    ///
    /// Stamps the node's item and/or category cooldown keys and counts a
    /// pacing firing. Refused without side effects if pacing would not allow
    /// a firing, so caps are never exceeded.
    pub fn commit(&mut self, node: &ContentNode, now: GameTime) -> Result<(), CommitError> {
        if !self.can_fire(now) {
            debug!(id = %node.id, "commit refused by pacing");
            return Err(CommitError::PacingExhausted {
                id: node.id.clone(),
            });
        }

        if node.cooldown_scope.includes_item() {
            self.ledger.record_fired(CooldownKey::item(&node.id), now);
        }
        if node.cooldown_scope.includes_category() {
            self.ledger
                .record_fired(CooldownKey::category(&node.category), now);
        }
        self.pacing.record_fired(now);
        self.commits += 1;

        debug!(id = %node.id, category = %node.category, at = %now, "content committed");
        Ok(())
    }

    pub fn record_shown(&mut self, node: &ContentNode) {
        self.engagement.record_shown(&node.category);
    }

    pub fn record_engaged(&mut self, node: &ContentNode) {
        self.engagement.record_engaged(&node.category);
    }

    pub fn record_ignored(&mut self, node: &ContentNode) {
        self.engagement.record_ignored(&node.category);
    }

    /// Drop cooldown entries that can no longer block anything.
    pub fn prune_cooldowns(&mut self, now: GameTime) -> usize {
        let catalog = self.catalog.snapshot();
        let longest = catalog
            .nodes()
            .iter()
            .map(|n| self.item_cooldown(n).max(self.category_cooldown(n)))
            .max()
            .unwrap_or(GameDuration::ZERO);
        self.ledger.prune(now, longest)
    }

    pub fn save_state(&self) -> SelectorStateDto {
        SelectorStateDto {
            cooldowns: self.ledger.to_dto(),
            pacing: self.pacing.to_dto(),
            engagement: self.engagement.to_dto(),
            commits: self.commits,
        }
    }

    /// Replace all mutable state with a saved snapshot. Nothing changes if
    /// any part fails to restore.
    pub fn restore_state(&mut self, state: &SelectorStateDto) -> Result<(), PersistError> {
        let restored = self.decode_state(state)?;
        self.apply_state(restored);
        Ok(())
    }

    pub(crate) fn decode_state(&self, state: &SelectorStateDto) -> Result<RestoredState, PersistError> {
        Ok(RestoredState {
            ledger: CooldownLedger::from_dto(&state.cooldowns)?,
            pacing: PacingLimiter::from_dto(state.pacing)?,
            engagement: EngagementTracker::from_dto(self.policy.engagement, &state.engagement)?,
            commits: state.commits,
        })
    }

    pub(crate) fn apply_state(&mut self, state: RestoredState) {
        self.ledger = state.ledger;
        self.pacing = state.pacing;
        self.engagement = state.engagement;
        self.commits = state.commits;
    }
}

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Highest weight; among equal weights the earliest-registered.
fn heaviest_first_registered<'c>(
    tier: &[(&'c Arc<ContentNode>, f64)],
) -> Option<(&'c Arc<ContentNode>, f64)> {
    tier.iter().copied().reduce(|best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    })
}

/// Draw proportionally to weight. `None` unless the total weight is positive
/// and finite.
fn weighted_pick<'c>(
    tier: &[(&'c Arc<ContentNode>, f64)],
    rng: &mut impl RngCore,
) -> Option<(&'c Arc<ContentNode>, f64)> {
    let total: f64 = tier.iter().map(|&(_, w)| w.max(0.0)).sum();
    if !(total > 0.0 && total.is_finite()) {
        return None;
    }

    let mut roll = rng.random_range(0.0..total);
    for &(node, weight) in tier {
        let weight = weight.max(0.0);
        if roll < weight {
            return Some((node, weight));
        }
        roll -= weight;
    }
    // Rounding can leave a sliver past the last bucket.
    tier.iter().rev().find(|(_, w)| *w > 0.0).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DialogueLine, OpportunityCard, Payload};
    use crate::predicate::PredicateSet;
    use crate::trigger::Trigger;
    use serde_json::Value;

    fn line(id: &str, group: &str, predicates: PredicateSet) -> ContentNode {
        ContentNode::new(
            id,
            Payload::Dialogue(DialogueLine {
                text_id: id.to_string(),
                fallback: String::new(),
                speaker: None,
            }),
        )
        .in_group(group)
        .with_predicates(predicates)
    }

    fn card(id: &str, category: &str, weight: f64) -> ContentNode {
        ContentNode::new(
            id,
            Payload::Opportunity(OpportunityCard {
                title: id.to_string(),
                description: String::new(),
                data: Value::Null,
            }),
        )
        .in_category(category)
        .with_weight(weight)
    }

    fn selector(nodes: Vec<ContentNode>, policy: SelectionPolicy) -> Selector {
        let (catalog, rejected) = Catalog::from_nodes(nodes);
        assert!(rejected.is_empty());
        Selector::new(CatalogHandle::new(catalog), policy)
    }

    fn greeting_nodes() -> Vec<ContentNode> {
        vec![
            line("greet_any", "greeting", PredicateSet::new()),
            line(
                "greet_night",
                "greeting",
                PredicateSet::new().with_text("time_of_day", "night"),
            ),
            line(
                "greet_night_veteran",
                "greeting",
                PredicateSet::new()
                    .with_text("time_of_day", "night")
                    .with_range("tier", 4, 9),
            ),
        ]
    }

    fn night_veteran() -> Context {
        Context::builder()
            .with("time_of_day", "night")
            .with("tier", 5)
            .build()
    }

    #[test]
    fn test_most_specific_wins() {
        let selector = selector(greeting_nodes(), SelectionPolicy::default());
        let selection = selector
            .select("greeting", &night_veteran(), GameTime::START)
            .unwrap();
        assert_eq!(selection.node.id, "greet_night_veteran");
        assert_eq!(selection.specificity, 2);
    }

    #[test]
    fn test_catch_all_when_nothing_specific_matches() {
        let selector = selector(greeting_nodes(), SelectionPolicy::default());
        let ctx = Context::builder().with("time_of_day", "morning").build();
        let selection = selector.select("greeting", &ctx, GameTime::START).unwrap();
        assert_eq!(selection.node.id, "greet_any");
    }

    #[test]
    fn test_unknown_group_selects_nothing() {
        let selector = selector(greeting_nodes(), SelectionPolicy::default());
        assert!(selector
            .select("farewell", &night_veteran(), GameTime::START)
            .is_none());
    }

    #[test]
    fn test_eligible_rank_order() {
        let selector = selector(greeting_nodes(), SelectionPolicy::default());
        let ids: Vec<_> = selector
            .eligible(Pool::Group("greeting"), &night_veteran(), GameTime::START)
            .iter()
            .map(|n| n.id.clone())
            .collect();
        assert_eq!(ids, vec!["greet_night_veteran", "greet_night", "greet_any"]);
    }

    #[test]
    fn test_requires_gate() {
        let nodes = vec![
            card("night_watch", "duty", 1.0).requiring(Trigger::parse("is_night").unwrap()),
        ];
        let selector = selector(nodes, SelectionPolicy::default());

        let day = Context::builder().with("is_night", false).build();
        let night = Context::builder().with("is_night", true).build();
        assert!(selector.select_any(&day, GameTime::START).is_none());
        assert!(selector.select_any(&night, GameTime::START).is_some());
    }

    #[test]
    fn test_restricted_to_domain() {
        let nodes = vec![line("hello", "hello", PredicateSet::new()), card("drill", "training", 1.0)];
        let selector = selector(nodes, SelectionPolicy::default()).restricted_to(Domain::Opportunity);

        let ids: Vec<_> = selector
            .eligible(Pool::All, &Context::empty(), GameTime::START)
            .iter()
            .map(|n| n.id.clone())
            .collect();
        assert_eq!(ids, vec!["drill"]);
        assert!(selector.select("hello", &Context::empty(), GameTime::START).is_none());
    }

    #[test]
    fn test_equal_weight_tie_uses_registration_order() {
        let nodes = vec![card("a", "x", 1.0), card("b", "x", 1.0), card("c", "x", 1.0)];
        let selector = selector(nodes, SelectionPolicy::default()).with_seed(99);

        for hour in 0..24 {
            let winner = selector
                .select_any(&Context::empty(), GameTime::from_hours(hour))
                .unwrap();
            assert_eq!(winner.node.id, "a");
        }
    }

    #[test]
    fn test_registration_tie_break_prefers_weight() {
        let nodes = vec![card("light", "x", 1.0), card("heavy", "x", 3.0), card("heavy2", "x", 3.0)];
        let policy = SelectionPolicy {
            tie_break: TieBreak::Registration,
            ..SelectionPolicy::default()
        };
        let selector = selector(nodes, policy);
        let winner = selector.select_any(&Context::empty(), GameTime::START).unwrap();
        assert_eq!(winner.node.id, "heavy");
    }

    #[test]
    fn test_weighted_draw_is_reproducible() {
        let nodes = vec![card("a", "x", 1.0), card("b", "x", 2.0), card("c", "x", 3.0)];
        let first = selector(nodes.clone(), SelectionPolicy::default()).with_seed(7);
        let second = selector(nodes, SelectionPolicy::default()).with_seed(7);

        for hour in 0..48 {
            let now = GameTime::from_hours(hour);
            let a = first.select_any(&Context::empty(), now).unwrap();
            let again = first.select_any(&Context::empty(), now).unwrap();
            let b = second.select_any(&Context::empty(), now).unwrap();
            assert_eq!(a.node.id, again.node.id);
            assert_eq!(a.node.id, b.node.id);
        }
    }

    #[test]
    fn test_weighted_draw_never_picks_zero_weight() {
        let nodes = vec![card("never", "x", 0.0), card("always", "x", 5.0)];
        let selector = selector(nodes, SelectionPolicy::default()).with_seed(3);
        for hour in 0..100 {
            let winner = selector
                .select_any(&Context::empty(), GameTime::from_hours(hour))
                .unwrap();
            assert_eq!(winner.node.id, "always");
        }
    }

    #[test]
    fn test_weighted_draw_visits_every_weighted_candidate() {
        let nodes = vec![card("a", "x", 1.0), card("b", "x", 2.0)];
        let selector = selector(nodes, SelectionPolicy::default()).with_seed(11);
        let mut seen = std::collections::HashSet::new();
        for hour in 0..200 {
            let winner = selector
                .select_any(&Context::empty(), GameTime::from_hours(hour))
                .unwrap();
            seen.insert(winner.node.id.clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_item_cooldown_blocks_until_elapsed() {
        let nodes = vec![card("x", "drill", 1.0).with_cooldown(GameDuration::from_days(7))];
        let mut selector = selector(nodes, SelectionPolicy::default());
        let ctx = Context::empty();

        let node = selector.select_any(&ctx, GameTime::from_days(0)).unwrap().node;
        selector.commit(&node, GameTime::from_days(0)).unwrap();

        assert!(selector.select_any(&ctx, GameTime::from_days(6)).is_none());
        assert!(selector.select_any(&ctx, GameTime::from_days(7)).is_some());
    }

    #[test]
    fn test_category_cooldown_blocks_siblings() {
        let nodes = vec![
            card("dice", "gambling", 1.0).with_scope(CooldownScope::ItemAndCategory),
            card("cards", "gambling", 1.0).with_scope(CooldownScope::ItemAndCategory),
            card("drill", "training", 1.0),
        ];
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited().with_category_cooldown(GameDuration::from_days(2)),
            ..SelectionPolicy::default()
        };
        let mut selector = selector(nodes, policy);
        let ctx = Context::empty();
        let now = GameTime::from_days(1);

        let dice = selector.catalog().snapshot().find("dice").cloned().unwrap();
        selector.commit(&dice, now).unwrap();

        assert!(selector.select_in_category("gambling", &ctx, now).is_none());
        assert_eq!(
            selector.select_in_category("training", &ctx, now).unwrap().node.id,
            "drill"
        );
        assert!(selector
            .select_in_category("gambling", &ctx, GameTime::from_days(3))
            .is_some());
    }

    #[test]
    fn test_pacing_gate_closes_whole_pool() {
        let nodes = vec![card("a", "x", 1.0), card("b", "x", 1.0), card("c", "x", 1.0)];
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited().with_daily_cap(2),
            ..SelectionPolicy::default()
        };
        let mut selector = selector(nodes, policy);
        let ctx = Context::empty();

        for hour in [8, 12] {
            let now = GameTime::at(0, hour, 0);
            let node = selector.select_any(&ctx, now).unwrap().node;
            selector.commit(&node, now).unwrap();
        }

        assert!(selector.select_any(&ctx, GameTime::at(0, 18, 0)).is_none());
        assert!(selector.select_any(&ctx, GameTime::at(1, 8, 0)).is_some());
    }

    #[test]
    fn test_commit_refused_past_cap() {
        let nodes = vec![card("a", "x", 1.0)];
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited().with_daily_cap(1),
            ..SelectionPolicy::default()
        };
        let mut selector = selector(nodes, policy);
        let node = selector.catalog().snapshot().nodes()[0].clone();

        selector.commit(&node, GameTime::START).unwrap();
        let before = selector.save_state();
        assert!(matches!(
            selector.commit(&node, GameTime::START),
            Err(CommitError::PacingExhausted { .. })
        ));
        assert_eq!(selector.save_state(), before);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut selector = selector(greeting_nodes(), SelectionPolicy::default());
        let node = selector
            .select("greeting", &night_veteran(), GameTime::START)
            .unwrap()
            .node;
        selector.commit(&node, GameTime::START).unwrap();
        let before = selector.save_state();

        for hour in 0..10 {
            let _ = selector.select("greeting", &night_veteran(), GameTime::from_hours(hour));
            let _ = selector.eligible(Pool::All, &night_veteran(), GameTime::from_hours(hour));
        }

        assert_eq!(selector.save_state(), before);
    }

    #[test]
    fn test_engagement_shifts_weight() {
        let nodes = vec![card("dice", "gambling", 1.0), card("drill", "training", 1.0)];
        let policy = SelectionPolicy {
            use_engagement: true,
            ..SelectionPolicy::default()
        };
        let mut selector = selector(nodes, policy);
        let dice = selector.catalog().snapshot().find("dice").cloned().unwrap();
        let drill = selector.catalog().snapshot().find("drill").cloned().unwrap();

        for _ in 0..4 {
            selector.record_shown(&dice);
            selector.record_engaged(&dice);
            selector.record_shown(&drill);
            selector.record_ignored(&drill);
        }

        let eligible = selector.eligible(Pool::All, &Context::empty(), GameTime::START);
        assert_eq!(eligible.len(), 2);
        assert!((selector.effective_weight(&dice) - 1.0).abs() < 1e-9);
        assert!((selector.effective_weight(&drill) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_engagement_bounds_still_select() {
        let nodes = vec![card("dice", "gambling", 1.0), card("drill", "training", 2.0)];
        let policy = SelectionPolicy {
            use_engagement: true,
            engagement: EngagementConfig {
                floor: f64::NAN,
                ceiling: f64::INFINITY,
                default_rate: f64::NAN,
            },
            ..SelectionPolicy::default()
        };
        let selector = selector(nodes, policy);

        assert!(selector.select_any(&Context::empty(), GameTime::START).is_some());
        let drill = selector.catalog().snapshot().find("drill").cloned().unwrap();
        assert!((selector.effective_weight(&drill) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_state_round_trip() {
        let nodes = vec![card("a", "x", 1.0).with_cooldown(GameDuration::from_days(3))];
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited().with_daily_cap(4),
            ..SelectionPolicy::default()
        };
        let mut original = selector(nodes.clone(), policy);
        let node = original.catalog().snapshot().nodes()[0].clone();
        original.commit(&node, GameTime::from_days(1)).unwrap();
        original.record_shown(&node);

        let mut restored = selector(nodes, policy);
        restored.restore_state(&original.save_state()).unwrap();

        assert_eq!(restored.save_state(), original.save_state());
        for day in 0..6 {
            let now = GameTime::from_days(day);
            assert_eq!(restored.is_cooling_down(&node, now), original.is_cooling_down(&node, now));
            assert_eq!(restored.can_fire(now), original.can_fire(now));
        }
    }

    #[test]
    fn test_prune_cooldowns() {
        let nodes = vec![card("a", "x", 1.0).with_cooldown(GameDuration::from_days(2))];
        let mut selector = selector(nodes, SelectionPolicy::default());
        let node = selector.catalog().snapshot().nodes()[0].clone();
        selector.commit(&node, GameTime::from_days(0)).unwrap();

        assert_eq!(selector.prune_cooldowns(GameTime::from_days(1)), 0);
        assert_eq!(selector.prune_cooldowns(GameTime::from_days(5)), 1);
        assert!(selector.ledger().is_empty());
    }
}
