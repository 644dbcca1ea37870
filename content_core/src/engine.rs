//! The engine: one catalog and one selector per domain, built from config.
//!
//! Constructed once at startup and passed by reference; nothing here is
//! global.

use std::path::PathBuf;
use tracing::info;

use crate::catalog::{Catalog, CatalogHandle, CatalogLoader, LoadReport};
use crate::config::EngineConfig;
use crate::domains::{DialogueResolver, OpportunityBoard, WorldEventMonitor};
use crate::error::{ConfigError, PersistError};
use crate::node::Domain;
use crate::persist::{EngineStateDto, STATE_VERSION};

/// Load reports from building every domain's catalog.
#[derive(Debug, Default)]
pub struct EngineLoadReport {
    pub dialogue: LoadReport,
    pub opportunity: LoadReport,
    pub world_event: LoadReport,
}

impl EngineLoadReport {
    pub fn is_clean(&self) -> bool {
        self.dialogue.is_clean() && self.opportunity.is_clean() && self.world_event.is_clean()
    }
}

#[derive(Debug)]
pub struct ContentEngine {
    config: EngineConfig,
    dialogue_catalog: CatalogHandle,
    opportunity_catalog: CatalogHandle,
    world_event_catalog: CatalogHandle,
    dialogue: DialogueResolver,
    opportunities: OpportunityBoard,
    world_events: WorldEventMonitor,
}

impl ContentEngine {
    /// Build every domain from `config`, loading its catalog files.
    pub fn new(config: EngineConfig) -> (Self, EngineLoadReport) {
        let (dialogue_catalog, dialogue_report) =
            load_catalog(Domain::Dialogue, &config.dialogue.catalogs);
        let (opportunity_catalog, opportunity_report) =
            load_catalog(Domain::Opportunity, &config.opportunity.catalogs);
        let (world_event_catalog, world_event_report) =
            load_catalog(Domain::WorldEvent, &config.world_event.catalogs);

        let engine = Self::from_catalogs(config, dialogue_catalog, opportunity_catalog, world_event_catalog);
        let report = EngineLoadReport {
            dialogue: dialogue_report,
            opportunity: opportunity_report,
            world_event: world_event_report,
        };
        info!(
            dialogue = engine.dialogue_catalog.snapshot().len(),
            opportunities = engine.opportunity_catalog.snapshot().len(),
            world_events = engine.world_event_catalog.snapshot().len(),
            clean = report.is_clean(),
            "content engine ready"
        );
        (engine, report)
    }

    /// Read the config file at `path`, then build as [`new`](Self::new).
    pub fn from_config_file(path: impl Into<PathBuf>) -> Result<(Self, EngineLoadReport), ConfigError> {
        let config = EngineConfig::load(path.into())?;
        Ok(Self::new(config))
    }

    /// Build around catalogs that are already in memory.
    pub fn from_catalogs(
        config: EngineConfig,
        dialogue: Catalog,
        opportunities: Catalog,
        world_events: Catalog,
    ) -> Self {
        let dialogue_catalog = CatalogHandle::new(dialogue);
        let opportunity_catalog = CatalogHandle::new(opportunities);
        let world_event_catalog = CatalogHandle::new(world_events);

        let seed = config.seed;
        let dialogue = DialogueResolver::with_policy(
            dialogue_catalog.clone(),
            config.selection_policy(Domain::Dialogue),
        );
        let opportunities = OpportunityBoard::new(
            opportunity_catalog.clone(),
            config.selection_policy(Domain::Opportunity),
        )
        .with_seed(seed);
        let world_events = WorldEventMonitor::new(
            world_event_catalog.clone(),
            config.selection_policy(Domain::WorldEvent),
        )
        .with_seed(seed);

        Self {
            config,
            dialogue_catalog,
            opportunity_catalog,
            world_event_catalog,
            dialogue,
            opportunities,
            world_events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dialogue(&self) -> &DialogueResolver {
        &self.dialogue
    }

    pub fn dialogue_mut(&mut self) -> &mut DialogueResolver {
        &mut self.dialogue
    }

    pub fn opportunities(&self) -> &OpportunityBoard {
        &self.opportunities
    }

    pub fn opportunities_mut(&mut self) -> &mut OpportunityBoard {
        &mut self.opportunities
    }

    pub fn world_events(&self) -> &WorldEventMonitor {
        &self.world_events
    }

    pub fn world_events_mut(&mut self) -> &mut WorldEventMonitor {
        &mut self.world_events
    }

    pub fn catalog(&self, domain: Domain) -> &CatalogHandle {
        match domain {
            Domain::Dialogue => &self.dialogue_catalog,
            Domain::Opportunity => &self.opportunity_catalog,
            Domain::WorldEvent => &self.world_event_catalog,
        }
    }

    /// Reload `domain`'s catalog files and swap the new table in. Cooldowns,
    /// pacing and engagement state are kept.
    pub fn reload(&self, domain: Domain) -> LoadReport {
        let (catalog, report) = load_catalog(domain, &self.config.domain(domain).catalogs);
        self.catalog(domain).replace(catalog);
        report
    }

    pub fn reload_dialogue(&self) -> LoadReport {
        self.reload(Domain::Dialogue)
    }

    pub fn reload_opportunities(&self) -> LoadReport {
        self.reload(Domain::Opportunity)
    }

    pub fn reload_world_events(&self) -> LoadReport {
        self.reload(Domain::WorldEvent)
    }

    /// Swap in a catalog built elsewhere.
    pub fn replace_catalog(&self, domain: Domain, catalog: Catalog) {
        self.catalog(domain).replace(catalog);
    }

    pub fn save_state(&self) -> EngineStateDto {
        EngineStateDto {
            version: STATE_VERSION,
            dialogue: self.dialogue.selector().save_state(),
            opportunity: self.opportunities.selector().save_state(),
            world_event: self.world_events.selector().save_state(),
        }
    }

    /// Restore every domain from `state`. If any domain fails to decode,
    /// no domain is changed.
    pub fn restore_state(&mut self, state: &EngineStateDto) -> Result<(), PersistError> {
        if state.version != STATE_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }

        let dialogue = self.dialogue.selector().decode_state(&state.dialogue)?;
        let opportunity = self.opportunities.selector().decode_state(&state.opportunity)?;
        let world_event = self.world_events.selector().decode_state(&state.world_event)?;

        self.dialogue.selector_mut().apply_state(dialogue);
        self.opportunities.selector_mut().apply_state(opportunity);
        self.world_events.selector_mut().apply_state(world_event);
        info!("content engine state restored");
        Ok(())
    }
}

fn load_catalog(domain: Domain, paths: &[PathBuf]) -> (Catalog, LoadReport) {
    let mut loader = CatalogLoader::for_domain(domain);
    for path in paths {
        loader.load(path);
    }
    loader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooldown::CooldownLedgerDto;
    use game_state::{Context, GameTime};

    const LINES: &str = r#"{
        "schema_version": 1,
        "nodes": [
            { "id": "hello", "payload": { "kind": "dialogue", "text_id": "hello.plain" } },
            { "id": "hello", "predicates": { "is_night": true },
              "payload": { "kind": "dialogue", "text_id": "hello.night" } }
        ]
    }"#;

    const CARDS: &str = r#"
        schema_version = 1

        [[nodes]]
        id = "dice"
        category = "gambling"
        cooldown_days = 2
        payload = { kind = "opportunity", title = "Dice" }
    "#;

    fn engine_in(dir: &std::path::Path) -> (ContentEngine, EngineLoadReport) {
        std::fs::write(dir.join("lines.json"), LINES).unwrap();
        std::fs::write(dir.join("cards.toml"), CARDS).unwrap();
        std::fs::write(
            dir.join("engine.toml"),
            "seed = 9\n[dialogue]\ncatalogs = [\"lines.json\"]\n[opportunity]\ncatalogs = [\"cards.toml\"]\n",
        )
        .unwrap();
        ContentEngine::from_config_file(dir.join("engine.toml")).unwrap()
    }

    #[test]
    fn test_builds_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, report) = engine_in(dir.path());

        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(engine.catalog(Domain::Dialogue).snapshot().len(), 2);
        assert_eq!(engine.catalog(Domain::Opportunity).snapshot().len(), 1);
        assert!(engine.catalog(Domain::WorldEvent).snapshot().is_empty());

        let night = Context::builder().with("is_night", true).build();
        let line = engine.dialogue().resolve("hello", &night, GameTime::START).unwrap();
        assert_eq!(line.text_id(), "hello.night");
    }

    #[test]
    fn test_reload_swaps_catalog_and_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_in(dir.path());
        let ctx = Context::empty();

        let dice = engine.opportunities().next(&ctx, GameTime::START).unwrap().node;
        engine.opportunities_mut().present(&dice, GameTime::START).unwrap();
        let before = engine.catalog(Domain::Opportunity).snapshot().version();

        std::fs::write(
            dir.path().join("cards.toml"),
            format!("{}\n[[nodes]]\nid = \"drill\"\npayload = {{ kind = \"opportunity\", title = \"Drill\" }}\n", CARDS),
        )
        .unwrap();
        let report = engine.reload_opportunities();

        assert!(report.is_clean());
        assert_ne!(engine.catalog(Domain::Opportunity).snapshot().version(), before);
        let next = engine.opportunities().next(&ctx, GameTime::START).unwrap();
        assert_eq!(next.node.id, "drill");
        assert_eq!(engine.opportunities().available_count(&ctx, GameTime::from_days(2)), 2);
    }

    #[test]
    fn test_save_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_in(dir.path());
        let ctx = Context::empty();

        let dice = engine.opportunities().next(&ctx, GameTime::START).unwrap().node;
        engine.opportunities_mut().present(&dice, GameTime::START).unwrap();
        let saved = engine.save_state().to_json().unwrap();

        let (mut fresh, _) = engine_in(dir.path());
        assert!(fresh.opportunities().next(&ctx, GameTime::START).is_some());
        fresh
            .restore_state(&EngineStateDto::from_json(&saved).unwrap())
            .unwrap();

        assert!(fresh.opportunities().next(&ctx, GameTime::START).is_none());
        assert_eq!(fresh.save_state(), engine.save_state());
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _) = engine_in(dir.path());
        let dice = engine.opportunities().next(&Context::empty(), GameTime::START).unwrap().node;
        engine.opportunities_mut().present(&dice, GameTime::START).unwrap();
        let before = engine.save_state();

        let mut broken = EngineStateDto::default();
        broken.world_event.cooldowns = CooldownLedgerDto {
            count: 3,
            keys: vec![],
            timestamps: vec![],
        };

        assert!(engine.restore_state(&broken).is_err());
        assert_eq!(engine.save_state(), before);
    }
}
