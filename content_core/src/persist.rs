//! Save-state DTOs.
//!
//! Everything is flattened to integers, strings and parallel arrays so hosts
//! with primitive-only save systems can store it field by field. Hosts that
//! can store a blob use [`EngineStateDto::to_json`].

use serde::{Deserialize, Serialize};

use crate::cooldown::CooldownLedgerDto;
use crate::engagement::EngagementDto;
use crate::error::PersistError;
use crate::pacing::PacingStateDto;

pub const STATE_VERSION: u32 = 1;

/// Mutable state of one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorStateDto {
    pub cooldowns: CooldownLedgerDto,
    pub pacing: PacingStateDto,
    pub engagement: EngagementDto,
    /// Commits so far; feeds the weighted-draw seed.
    pub commits: u64,
}

/// Mutable state of a whole engine, one entry per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStateDto {
    pub version: u32,
    #[serde(default)]
    pub dialogue: SelectorStateDto,
    #[serde(default)]
    pub opportunity: SelectorStateDto,
    #[serde(default)]
    pub world_event: SelectorStateDto,
}

impl Default for EngineStateDto {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            dialogue: SelectorStateDto::default(),
            opportunity: SelectorStateDto::default(),
            world_event: SelectorStateDto::default(),
        }
    }
}

impl EngineStateDto {
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(|e| PersistError::Decode(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        let state: Self =
            serde_json::from_str(text).map_err(|e| PersistError::Decode(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }
        Ok(state)
    }
}
