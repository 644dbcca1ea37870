//! Engine configuration, read from a TOML document.
//!
//! ```toml
//! seed = 42
//!
//! [dialogue]
//! catalogs = ["content/dialogue"]
//!
//! [opportunity]
//! catalogs = ["content/opportunities.json"]
//! tie_break = "weighted_random"
//!
//! [opportunity.policy]
//! max_per_day = 3
//! per_event_cooldown_days = 2
//!
//! [opportunity.engagement]
//! floor = 0.25
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engagement::EngagementConfig;
use crate::error::ConfigError;
use crate::node::Domain;
use crate::pacing::PacingPolicy;
use crate::selector::{SelectionPolicy, TieBreak};

/// Settings for one selection domain. Unset fields fall back to the
/// domain's defaults (see [`EngineConfig::selection_policy`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Catalog files or directories, loaded in order.
    pub catalogs: Vec<PathBuf>,
    pub policy: PacingPolicy,
    pub tie_break: Option<TieBreak>,
    pub use_engagement: Option<bool>,
    pub engagement: EngagementConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for every weighted draw.
    pub seed: u64,
    pub dialogue: DomainConfig,
    pub opportunity: DomainConfig,
    pub world_event: DomainConfig,
}

impl EngineConfig {
    /// Read and validate a config file. Relative catalog paths are resolved
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        debug!(path = %path.display(), seed = config.seed, "loaded engine config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn domain(&self, domain: Domain) -> &DomainConfig {
        match domain {
            Domain::Dialogue => &self.dialogue,
            Domain::Opportunity => &self.opportunity,
            Domain::WorldEvent => &self.world_event,
        }
    }

    /// Effective policy for `domain`.
    ///
    /// Dialogue defaults to registration-order ties; opportunities default to
    /// weighted draws with engagement; world events to weighted draws alone.
    pub fn selection_policy(&self, domain: Domain) -> SelectionPolicy {
        let (tie_break, use_engagement) = match domain {
            Domain::Dialogue => (TieBreak::Registration, false),
            Domain::Opportunity => (TieBreak::WeightedRandom, true),
            Domain::WorldEvent => (TieBreak::WeightedRandom, false),
        };
        let config = self.domain(domain);
        SelectionPolicy {
            pacing: config.policy,
            tie_break: config.tie_break.unwrap_or(tie_break),
            use_engagement: config.use_engagement.unwrap_or(use_engagement),
            engagement: config.engagement,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for domain in [Domain::Dialogue, Domain::Opportunity, Domain::WorldEvent] {
            let e = &self.domain(domain).engagement;
            let in_unit = |v: f64| (0.0..=1.0).contains(&v);
            if !in_unit(e.floor) || !in_unit(e.ceiling) || !in_unit(e.default_rate) {
                return Err(ConfigError::Invalid(format!(
                    "{}: engagement bounds must lie in [0, 1]",
                    domain
                )));
            }
            if e.floor > e.ceiling {
                return Err(ConfigError::Invalid(format!(
                    "{}: engagement floor {} exceeds ceiling {}",
                    domain, e.floor, e.ceiling
                )));
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        for config in [&mut self.dialogue, &mut self.opportunity, &mut self.world_event] {
            for path in &mut config.catalogs {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}
