//! Content nodes - authored candidates with eligibility rules and a payload.

use game_state::{Context, GameDuration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::NodeValidationError;
use crate::predicate::PredicateSet;
use crate::trigger::{evaluate_all, Trigger};

/// The feature a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Dialogue,
    Opportunity,
    WorldEvent,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Dialogue => "dialogue",
            Domain::Opportunity => "opportunity",
            Domain::WorldEvent => "world_event",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities every payload kind exposes to the engine.
pub trait ContentKind {
    fn domain(&self) -> Domain;

    /// Key the host uses to look up display text.
    fn display_key(&self) -> &str;

    /// Whether per-category engagement counters should influence ranking.
    fn tracks_engagement(&self) -> bool {
        false
    }
}

/// A conversation line variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Localization key for the line text.
    pub text_id: String,
    /// Text shown when the key cannot be resolved.
    #[serde(default)]
    pub fallback: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

impl ContentKind for DialogueLine {
    fn domain(&self) -> Domain {
        Domain::Dialogue
    }

    fn display_key(&self) -> &str {
        &self.text_id
    }
}

/// A situational activity offered to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityCard {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Host-specific data (rewards, costs); opaque to the engine.
    #[serde(default)]
    pub data: Value,
}

impl ContentKind for OpportunityCard {
    fn domain(&self) -> Domain {
        Domain::Opportunity
    }

    fn display_key(&self) -> &str {
        &self.title
    }

    fn tracks_engagement(&self) -> bool {
        true
    }
}

/// How strongly a world event interrupts play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    /// Shown as a notification.
    #[default]
    Minor,
    /// Opens an inquiry the player must answer.
    Major,
}

/// A world-state event fired when its triggers hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCard {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub severity: EventSeverity,
    #[serde(default)]
    pub data: Value,
}

impl ContentKind for EventCard {
    fn domain(&self) -> Domain {
        Domain::WorldEvent
    }

    fn display_key(&self) -> &str {
        &self.title
    }
}

/// What a node delivers when selected, tagged by `kind` in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Dialogue(DialogueLine),
    Opportunity(OpportunityCard),
    WorldEvent(EventCard),
}

impl Payload {
    pub fn kind(&self) -> &dyn ContentKind {
        match self {
            Payload::Dialogue(line) => line,
            Payload::Opportunity(card) => card,
            Payload::WorldEvent(card) => card,
        }
    }

    pub fn domain(&self) -> Domain {
        self.kind().domain()
    }

    pub fn as_dialogue(&self) -> Option<&DialogueLine> {
        match self {
            Payload::Dialogue(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_opportunity(&self) -> Option<&OpportunityCard> {
        match self {
            Payload::Opportunity(card) => Some(card),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&EventCard> {
        match self {
            Payload::WorldEvent(card) => Some(card),
            _ => None,
        }
    }
}

/// Which ledger keys a node's cooldown applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    #[default]
    Item,
    Category,
    ItemAndCategory,
}

impl CooldownScope {
    pub fn includes_item(&self) -> bool {
        matches!(self, CooldownScope::Item | CooldownScope::ItemAndCategory)
    }

    pub fn includes_category(&self) -> bool {
        matches!(self, CooldownScope::Category | CooldownScope::ItemAndCategory)
    }
}

/// A choice attached to a node (a reply in a conversation menu, a way to
/// handle an event).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentOption {
    pub id: String,
    pub text: String,
    pub tooltip: Option<String>,
    pub requires: Vec<Trigger>,
}

impl ContentOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tooltip: None,
            requires: Vec::new(),
        }
    }

    pub fn requiring(mut self, trigger: Trigger) -> Self {
        self.requires.push(trigger);
        self
    }

    pub fn is_available(&self, context: &Context) -> bool {
        evaluate_all(&self.requires, context)
    }
}

/// One authored candidate.
///
/// Nodes sharing a `group` are variants of the same line or option; the
/// `category` groups nodes for category-scoped cooldowns and engagement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentNode {
    pub id: String,
    pub group: String,
    pub category: String,
    pub predicates: PredicateSet,
    pub payload: Payload,
    pub base_weight: f64,
    /// Overrides the domain's per-item cooldown when set.
    pub cooldown: Option<GameDuration>,
    pub cooldown_scope: CooldownScope,
    /// Trigger gates evaluated against the selection context.
    pub requires: Vec<Trigger>,
    pub options: Vec<ContentOption>,
    order: usize,
}

impl ContentNode {
    /// Create a node in its own group and category with weight 1.
    pub fn new(id: impl Into<String>, payload: Payload) -> Self {
        let id = id.into();
        Self {
            group: id.clone(),
            category: id.clone(),
            id,
            predicates: PredicateSet::new(),
            payload,
            base_weight: 1.0,
            cooldown: None,
            cooldown_scope: CooldownScope::Item,
            requires: Vec::new(),
            options: Vec::new(),
            order: 0,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_predicates(mut self, predicates: PredicateSet) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.base_weight = weight;
        self
    }

    pub fn with_cooldown(mut self, cooldown: GameDuration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_scope(mut self, scope: CooldownScope) -> Self {
        self.cooldown_scope = scope;
        self
    }

    pub fn requiring(mut self, trigger: Trigger) -> Self {
        self.requires.push(trigger);
        self
    }

    pub fn with_option(mut self, option: ContentOption) -> Self {
        self.options.push(option);
        self
    }

    /// Registration index within its catalog; earlier nodes win exact ties.
    pub fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn set_order(&mut self, order: usize) {
        self.order = order;
    }

    pub fn specificity(&self) -> usize {
        self.predicates.specificity()
    }

    /// Predicate match plus trigger gates, both against `context`.
    pub fn is_applicable(&self, context: &Context) -> bool {
        self.predicates.matches(context) && evaluate_all(&self.requires, context)
    }

    /// Options whose own gates pass in `context`.
    pub fn available_options(&self, context: &Context) -> Vec<&ContentOption> {
        self.options.iter().filter(|o| o.is_available(context)).collect()
    }

    /// Decode and validate one authored node.
    pub fn from_config(raw: Value) -> Result<Self, NodeValidationError> {
        let spec: NodeSpec =
            serde_json::from_value(raw).map_err(|e| NodeValidationError::Decode(e.to_string()))?;
        spec.into_node()
    }
}

fn default_weight() -> f64 {
    1.0
}

/// The authored shape of a node. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct NodeSpec {
    id: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    predicates: BTreeMap<String, Value>,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    cooldown_days: Option<f64>,
    #[serde(default)]
    cooldown_scope: CooldownScope,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    options: Vec<OptionSpec>,
    payload: Payload,
}

#[derive(Debug, Deserialize)]
struct OptionSpec {
    id: String,
    text: String,
    #[serde(default)]
    tooltip: Option<String>,
    #[serde(default)]
    requires: Vec<String>,
}

fn parse_triggers(id: &str, tokens: &[String]) -> Result<Vec<Trigger>, NodeValidationError> {
    tokens
        .iter()
        .map(|token| {
            Trigger::parse(token).map_err(|source| NodeValidationError::UnrecognizedToken {
                id: id.to_string(),
                source,
            })
        })
        .collect()
}

impl NodeSpec {
    fn into_node(self) -> Result<ContentNode, NodeValidationError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(NodeValidationError::EmptyId);
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(NodeValidationError::InvalidWeight {
                id,
                weight: self.weight,
            });
        }

        let predicates = PredicateSet::from_config(&id, &self.predicates)?;
        let requires = parse_triggers(&id, &self.requires)?;
        let options = self
            .options
            .into_iter()
            .map(|o| {
                Ok(ContentOption {
                    requires: parse_triggers(&id, &o.requires)?,
                    id: o.id,
                    text: o.text,
                    tooltip: o.tooltip,
                })
            })
            .collect::<Result<Vec<_>, NodeValidationError>>()?;

        let group = self.group.unwrap_or_else(|| id.clone());
        let category = self.category.unwrap_or_else(|| group.clone());

        Ok(ContentNode {
            id,
            group,
            category,
            predicates,
            payload: self.payload,
            base_weight: self.weight,
            cooldown: self.cooldown_days.map(GameDuration::from_days_f64),
            cooldown_scope: self.cooldown_scope,
            requires,
            options,
            order: 0,
        })
    }
}
