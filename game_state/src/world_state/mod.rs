//! World state - the live values content is matched against.
//!
//! The simulation that produces these numbers lives elsewhere; this module only
//! holds the latest snapshot and turns it into a [`Context`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::context::{AttributeValue, Context, ContextBuilder};
use crate::time::{GameDuration, GameTime};

/// Read-only access to flags and numeric values, used by trigger evaluation.
pub trait WorldView {
    /// Whether the named flag is set. Unknown flags are false.
    fn get_flag(&self, name: &str) -> bool;

    /// The named numeric value, if the world knows it.
    fn get_numeric(&self, name: &str) -> Option<f64>;
}

impl<T: WorldView + ?Sized> WorldView for &T {
    fn get_flag(&self, name: &str) -> bool {
        (**self).get_flag(name)
    }

    fn get_numeric(&self, name: &str) -> Option<f64> {
        (**self).get_numeric(name)
    }
}

/// The fixed set of numeric resources content may compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Supply,
    Morale,
    Reputation,
    Heat,
    Discipline,
    Fatigue,
    Gold,
    Tier,
}

impl Resource {
    pub const ALL: [Resource; 8] = [
        Resource::Supply,
        Resource::Morale,
        Resource::Reputation,
        Resource::Heat,
        Resource::Discipline,
        Resource::Fatigue,
        Resource::Gold,
        Resource::Tier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Supply => "supply",
            Resource::Morale => "morale",
            Resource::Reputation => "reputation",
            Resource::Heat => "heat",
            Resource::Discipline => "discipline",
            Resource::Fatigue => "fatigue",
            Resource::Gold => "gold",
            Resource::Tier => "tier",
        }
    }
}

/// Returned when a name is not part of the resource vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource '{0}'")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Foggy,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Cloudy => "cloudy",
            Weather::Rainy => "rainy",
            Weather::Stormy => "stormy",
            Weather::Snowy => "snowy",
            Weather::Foggy => "foggy",
        }
    }
}

/// The latest snapshot of everything content can react to.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    /// Global time tracking.
    pub time: GameTime,

    pub weather: Weather,

    /// Boolean flags set during play (`in_army`, `on_leave`, quest flags, ...).
    pub flags: HashMap<String, bool>,

    /// Current value of each tracked resource.
    pub resources: HashMap<Resource, i64>,

    /// Free-form attributes such as `faction` or `last_action_category`.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl WorldState {
    /// Create a new empty world state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    pub fn set_resource(&mut self, resource: Resource, value: i64) {
        self.resources.insert(resource, value);
    }

    pub fn resource(&self, resource: Resource) -> Option<i64> {
        self.resources.get(&resource).copied()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Advance time by the given duration.
    pub fn advance_time(&mut self, by: GameDuration) {
        self.time = self.time + by;
    }

    /// Derived flags computed from the clock rather than stored.
    fn derived_flag(&self, name: &str) -> Option<bool> {
        match name {
            "is_night" => Some(self.time.is_night()),
            "is_day" => Some(!self.time.is_night()),
            "is_winter" => Some(self.time.season() == crate::time::Season::Winter),
            _ => None,
        }
    }

    /// Build the selection context for the current moment.
    ///
    /// Stored flags and free-form attributes are copied verbatim; clock-derived
    /// values (`time_of_day`, `season`, `day`, `is_night`, ...) and resources
    /// are added under their canonical names.
    pub fn to_context(&self) -> Context {
        let mut builder = ContextBuilder::default();

        for (name, value) in &self.attributes {
            builder.set(name.clone(), value.clone());
        }
        for (name, value) in &self.flags {
            builder.set(name.clone(), *value);
        }
        for (resource, value) in &self.resources {
            builder.set(resource.as_str(), *value);
        }

        builder
            .with("time_of_day", self.time.time_of_day().as_str())
            .with("season", self.time.season().as_str())
            .with("weather", self.weather.as_str())
            .with("day", self.time.day_index() as i64)
            .with("is_night", self.time.is_night())
            .with("is_day", !self.time.is_night())
            .with("is_winter", self.time.season() == crate::time::Season::Winter)
            .build()
    }
}

impl WorldView for WorldState {
    fn get_flag(&self, name: &str) -> bool {
        self.derived_flag(name)
            .or_else(|| self.flags.get(name).copied())
            .unwrap_or(false)
    }

    fn get_numeric(&self, name: &str) -> Option<f64> {
        name.parse::<Resource>()
            .ok()
            .and_then(|r| self.resource(r))
            .or_else(|| self.attributes.get(name).and_then(AttributeValue::as_int))
            .map(|v| v as f64)
    }
}
