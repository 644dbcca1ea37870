//! Engagement counters and the bounded weight adjustment they feed.
//!
//! Categories the player keeps choosing drift up toward `ceiling`, ignored
//! ones drift down toward `floor`; neither ever reaches zero.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PersistError;

/// Bounds for the engagement multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub floor: f64,
    pub ceiling: f64,
    /// Rate assumed for a category that has never been shown.
    pub default_rate: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            floor: 0.2,
            ceiling: 1.0,
            default_rate: 0.5,
        }
    }
}

/// Per-category counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub shown: u32,
    pub engaged: u32,
    pub ignored: u32,
}

impl EngagementCounters {
    /// `engaged / shown`, or `None` if nothing was shown yet.
    pub fn rate(&self) -> Option<f64> {
        (self.shown > 0).then(|| self.engaged as f64 / self.shown as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementTracker {
    config: EngagementConfig,
    categories: HashMap<String, EngagementCounters>,
}

impl EngagementTracker {
    pub fn new(config: EngagementConfig) -> Self {
        Self {
            config,
            categories: HashMap::new(),
        }
    }

    /// Keep `other`'s counters under new bounds.
    pub fn from_counters(config: EngagementConfig, other: &EngagementTracker) -> Self {
        Self {
            config,
            categories: other.categories.clone(),
        }
    }

    pub fn config(&self) -> &EngagementConfig {
        &self.config
    }

    pub fn counters(&self, category: &str) -> EngagementCounters {
        self.categories.get(category).copied().unwrap_or_default()
    }

    pub fn record_shown(&mut self, category: &str) {
        let c = self.categories.entry(category.to_string()).or_default();
        c.shown = c.shown.saturating_add(1);
    }

    pub fn record_engaged(&mut self, category: &str) {
        let c = self.categories.entry(category.to_string()).or_default();
        c.engaged = c.engaged.saturating_add(1);
    }

    pub fn record_ignored(&mut self, category: &str) {
        let c = self.categories.entry(category.to_string()).or_default();
        c.ignored = c.ignored.saturating_add(1);
    }

    /// Clamped engagement rate for `category`.
    pub fn multiplier(&self, category: &str) -> f64 {
        let fallback = EngagementConfig::default();
        let (lo, hi) = match (self.config.floor, self.config.ceiling) {
            (lo, hi) if !lo.is_finite() || !hi.is_finite() => (fallback.floor, fallback.ceiling),
            (lo, hi) if lo <= hi => (lo, hi),
            (lo, hi) => (hi, lo),
        };
        let rate = match self.counters(category).rate() {
            Some(rate) => rate,
            None if self.config.default_rate.is_finite() => self.config.default_rate,
            None => fallback.default_rate,
        };
        rate.clamp(lo, hi)
    }

    /// `base_weight * clamp(engagement_rate, floor, ceiling)`.
    pub fn effective_weight(&self, base_weight: f64, category: &str) -> f64 {
        base_weight * self.multiplier(category)
    }

    pub fn to_dto(&self) -> EngagementDto {
        let mut rows: Vec<_> = self.categories.iter().collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));

        EngagementDto {
            count: rows.len(),
            categories: rows.iter().map(|(k, _)| (*k).clone()).collect(),
            shown: rows.iter().map(|(_, c)| c.shown).collect(),
            engaged: rows.iter().map(|(_, c)| c.engaged).collect(),
            ignored: rows.iter().map(|(_, c)| c.ignored).collect(),
        }
    }

    /// Restore counters; the bounds come from configuration, not the save.
    pub fn from_dto(config: EngagementConfig, dto: &EngagementDto) -> Result<Self, PersistError> {
        for (field, actual) in [
            ("categories", dto.categories.len()),
            ("shown", dto.shown.len()),
            ("engaged", dto.engaged.len()),
            ("ignored", dto.ignored.len()),
        ] {
            if actual != dto.count {
                return Err(PersistError::LengthMismatch {
                    what: "engagement",
                    field,
                    count: dto.count,
                    actual,
                });
            }
        }

        let categories = (0..dto.count)
            .map(|i| {
                (
                    dto.categories[i].clone(),
                    EngagementCounters {
                        shown: dto.shown[i],
                        engaged: dto.engaged[i],
                        ignored: dto.ignored[i],
                    },
                )
            })
            .collect();

        Ok(Self { config, categories })
    }
}

/// Saved form of [`EngagementTracker`] as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementDto {
    pub count: usize,
    pub categories: Vec<String>,
    pub shown: Vec<u32>,
    pub engaged: Vec<u32>,
    pub ignored: Vec<u32>,
}
