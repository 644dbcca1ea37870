//! Cooldown ledger - "when did this last fire?" for content ids and categories.

use game_state::{GameDuration, GameTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PersistError;

/// Namespaced ledger keys, so one ledger can hold item and category entries
/// without collisions.
pub struct CooldownKey;

impl CooldownKey {
    pub const ITEM_PREFIX: &'static str = "item:";
    pub const CATEGORY_PREFIX: &'static str = "category:";

    pub fn item(id: &str) -> String {
        format!("{}{}", Self::ITEM_PREFIX, id)
    }

    pub fn category(name: &str) -> String {
        format!("{}{}", Self::CATEGORY_PREFIX, name)
    }
}

/// Last-fired timestamps keyed by [`CooldownKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CooldownLedger {
    entries: HashMap<String, GameTime>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `key` fired less than `duration` before `now`.
    pub fn is_cooling_down(&self, key: &str, duration: GameDuration, now: GameTime) -> bool {
        self.entries
            .get(key)
            .is_some_and(|last| now.since(*last) < duration)
    }

    /// Record that `key` fired at `now`, replacing any earlier entry.
    pub fn record_fired(&mut self, key: impl Into<String>, now: GameTime) {
        self.entries.insert(key.into(), now);
    }

    pub fn last_fired(&self, key: &str) -> Option<GameTime> {
        self.entries.get(key).copied()
    }

    /// Time left before `key` is available again; zero when it already is.
    pub fn remaining(&self, key: &str, duration: GameDuration, now: GameTime) -> GameDuration {
        match self.entries.get(key) {
            Some(last) => {
                let elapsed = now.since(*last);
                GameDuration::from_minutes(duration.minutes().saturating_sub(elapsed.minutes()))
            }
            None => GameDuration::ZERO,
        }
    }

    /// Drop entries older than `horizon`; they can no longer block anything
    /// whose cooldown is at most `horizon`.
    pub fn prune(&mut self, now: GameTime, horizon: GameDuration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, last| now.since(*last) < horizon);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into parallel arrays, sorted by key so saves are stable.
    pub fn to_dto(&self) -> CooldownLedgerDto {
        let mut pairs: Vec<_> = self.entries.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));

        CooldownLedgerDto {
            count: pairs.len(),
            keys: pairs.iter().map(|(k, _)| (*k).clone()).collect(),
            timestamps: pairs.iter().map(|(_, t)| t.minutes()).collect(),
        }
    }

    /// Rebuild from saved parallel arrays.
    pub fn from_dto(dto: &CooldownLedgerDto) -> Result<Self, PersistError> {
        dto.check_lengths()?;
        let entries = dto
            .keys
            .iter()
            .cloned()
            .zip(dto.timestamps.iter().map(|m| GameTime::from_minutes(*m)))
            .collect();
        Ok(Self { entries })
    }
}

/// Saved form of a [`CooldownLedger`]: `(count, [key_i], [timestamp_i])`.
///
/// Timestamps are game minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownLedgerDto {
    pub count: usize,
    pub keys: Vec<String>,
    pub timestamps: Vec<u64>,
}

impl CooldownLedgerDto {
    fn check_lengths(&self) -> Result<(), PersistError> {
        for (field, actual) in [("keys", self.keys.len()), ("timestamps", self.timestamps.len())] {
            if actual != self.count {
                return Err(PersistError::LengthMismatch {
                    what: "cooldown ledger",
                    field,
                    count: self.count,
                    actual,
                });
            }
        }
        Ok(())
    }
}
