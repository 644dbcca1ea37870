//! Trigger tokens - small boolean gates over world flags and resources.
//!
//! Tokens are parsed once when content loads, so authoring mistakes surface
//! immediately instead of during play. Evaluation never fails: tokens that
//! are reserved for future use, and comparisons against unknown values,
//! simply evaluate to false.
//!
//! # Grammar
//!
//! ```text
//! token   := keyword
//!          | "flag:" name
//!          | "not:flag:" name
//!          | resource " " op " " number
//! op      := "<" | "<=" | ">" | ">=" | "=="
//! ```

use game_state::{Resource, WorldView};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Failure to parse an authored trigger token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerParseError {
    #[error("unrecognized trigger token '{0}'")]
    Unrecognized(String),

    #[error("trigger token '{0}' names an empty flag")]
    EmptyFlag(String),

    #[error("trigger token '{token}': '{value}' is not a number")]
    BadNumber { token: String, value: String },
}

/// Bare keywords with a fixed meaning, looked up as world flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    IsNight,
    IsDay,
    InSettlement,
    InArmy,
    InBattle,
    InSiege,
    AtSea,
    OnLeave,
    IsWinter,
}

impl Keyword {
    pub const ALL: [Keyword; 9] = [
        Keyword::IsNight,
        Keyword::IsDay,
        Keyword::InSettlement,
        Keyword::InArmy,
        Keyword::InBattle,
        Keyword::InSiege,
        Keyword::AtSea,
        Keyword::OnLeave,
        Keyword::IsWinter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::IsNight => "is_night",
            Keyword::IsDay => "is_day",
            Keyword::InSettlement => "in_settlement",
            Keyword::InArmy => "in_army",
            Keyword::InBattle => "in_battle",
            Keyword::InSiege => "in_siege",
            Keyword::AtSea => "at_sea",
            Keyword::OnLeave => "on_leave",
            Keyword::IsWinter => "is_winter",
        }
    }

    fn lookup(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }
}

/// Keywords that parse but are not wired to any world state yet.
pub const RESERVED_KEYWORDS: &[&str] = &["in_tournament", "in_prison", "near_capital", "is_festival"];

/// Comparison operators for resource tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    fn lookup(s: &str) -> Option<Self> {
        match s {
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "==" => Some(CompareOp::Eq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
        }
    }

    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// A parsed trigger token.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Keyword(Keyword),
    Flag(String),
    NotFlag(String),
    Compare {
        resource: Resource,
        op: CompareOp,
        value: f64,
    },
    /// Recognized for forward compatibility; always false.
    Reserved(String),
}

impl Trigger {
    /// Parse one authored token.
    pub fn parse(token: &str) -> Result<Self, TriggerParseError> {
        let token = token.trim();

        if let Some(name) = token.strip_prefix("not:flag:") {
            return flag_name(token, name).map(Trigger::NotFlag);
        }
        if let Some(name) = token.strip_prefix("flag:") {
            return flag_name(token, name).map(Trigger::Flag);
        }

        let parts: Vec<&str> = token.split_whitespace().collect();
        match parts.as_slice() {
            [word] => {
                if let Some(keyword) = Keyword::lookup(word) {
                    Ok(Trigger::Keyword(keyword))
                } else if RESERVED_KEYWORDS.contains(word) {
                    Ok(Trigger::Reserved(word.to_string()))
                } else {
                    Err(TriggerParseError::Unrecognized(token.to_string()))
                }
            }
            [name, op, number] => {
                let resource = name
                    .parse::<Resource>()
                    .map_err(|_| TriggerParseError::Unrecognized(token.to_string()))?;
                let op = CompareOp::lookup(op)
                    .ok_or_else(|| TriggerParseError::Unrecognized(token.to_string()))?;
                let value = number
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| TriggerParseError::BadNumber {
                        token: token.to_string(),
                        value: number.to_string(),
                    })?;
                Ok(Trigger::Compare {
                    resource,
                    op,
                    value,
                })
            }
            _ => Err(TriggerParseError::Unrecognized(token.to_string())),
        }
    }

    /// Parse a comma-separated list of tokens. Empty entries are ignored.
    pub fn parse_list(text: &str) -> Result<Vec<Self>, TriggerParseError> {
        text.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Trigger::parse)
            .collect()
    }

    /// Evaluate against the world. Never fails.
    pub fn evaluate(&self, world: &impl WorldView) -> bool {
        match self {
            Trigger::Keyword(keyword) => world.get_flag(keyword.as_str()),
            Trigger::Flag(name) => world.get_flag(name),
            Trigger::NotFlag(name) => !world.get_flag(name),
            Trigger::Compare {
                resource,
                op,
                value,
            } => world
                .get_numeric(resource.as_str())
                .is_some_and(|current| op.apply(current, *value)),
            Trigger::Reserved(name) => {
                tracing::trace!(token = %name, "reserved trigger evaluated as false");
                false
            }
        }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Trigger::Reserved(_))
    }
}

fn flag_name(token: &str, name: &str) -> Result<String, TriggerParseError> {
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        Err(TriggerParseError::EmptyFlag(token.to_string()))
    } else {
        Ok(name.to_string())
    }
}

/// True when every trigger passes. An empty list passes.
pub fn evaluate_all(triggers: &[Trigger], world: &impl WorldView) -> bool {
    triggers.iter().all(|t| t.evaluate(world))
}

impl FromStr for Trigger {
    type Err = TriggerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::parse(s)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Keyword(k) => f.write_str(k.as_str()),
            Trigger::Flag(name) => write!(f, "flag:{}", name),
            Trigger::NotFlag(name) => write!(f, "not:flag:{}", name),
            Trigger::Compare {
                resource,
                op,
                value,
            } => write!(f, "{} {} {}", resource, op.as_str(), value),
            Trigger::Reserved(name) => f.write_str(name),
        }
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Trigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Trigger::parse(&text).map_err(serde::de::Error::custom)
    }
}
