use content_core::game_state::{Context, GameDuration, GameTime};
use content_core::{
    Catalog, CatalogHandle, ContentNode, DialogueLine, PacingPolicy, Payload, Pool, PredicateSet,
    SelectionPolicy, Selector, SelectorStateDto, TieBreak,
};
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct NodeShape {
    armed: Option<bool>,
    in_camp: Option<bool>,
    tier: Option<(i64, i64)>,
    weight: f64,
}

fn node_shape() -> impl Strategy<Value = NodeShape> {
    (
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of((0_i64..10, 0_i64..10).prop_map(|(a, b)| (a.min(b), a.max(b)))),
        0.0_f64..5.0,
    )
        .prop_map(|(armed, in_camp, tier, weight)| NodeShape {
            armed,
            in_camp,
            tier,
            weight,
        })
}

fn place(in_camp: bool) -> &'static str {
    if in_camp {
        "camp"
    } else {
        "town"
    }
}

fn context() -> impl Strategy<Value = Context> {
    (
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of(0_i64..10),
    )
        .prop_map(|(armed, in_camp, tier)| {
            Context::builder()
                .with_opt("armed", armed)
                .with_opt("place", in_camp.map(place))
                .with_opt("tier", tier)
                .build()
        })
}

fn build_node(index: usize, shape: &NodeShape) -> ContentNode {
    let mut predicates = PredicateSet::new();
    if let Some(armed) = shape.armed {
        predicates = predicates.with_flag("armed", armed);
    }
    if let Some(in_camp) = shape.in_camp {
        predicates = predicates.with_text("place", place(in_camp));
    }
    if let Some((min, max)) = shape.tier {
        predicates = predicates.with_range("tier", min, max);
    }

    ContentNode::new(
        format!("line_{}", index),
        Payload::Dialogue(DialogueLine {
            text_id: format!("line_{}", index),
            fallback: String::new(),
            speaker: None,
        }),
    )
    .in_group("bark")
    .with_predicates(predicates)
    .with_weight(shape.weight)
}

fn selector_for(shapes: &[NodeShape], policy: SelectionPolicy) -> Selector {
    let (catalog, _) = Catalog::from_nodes(shapes.iter().enumerate().map(|(i, s)| build_node(i, s)));
    Selector::new(CatalogHandle::new(catalog), policy)
}

fn tie_break(registration: bool) -> TieBreak {
    if registration {
        TieBreak::Registration
    } else {
        TieBreak::WeightedRandom
    }
}

proptest! {
    #[test]
    fn winner_matches_and_is_most_specific(
        shapes in vec(node_shape(), 1..12),
        ctx in context(),
        seed in any::<u64>(),
        registration in any::<bool>(),
    ) {
        let policy = SelectionPolicy {
            tie_break: tie_break(registration),
            ..SelectionPolicy::default()
        };
        let selector = selector_for(&shapes, policy).with_seed(seed);
        let eligible = selector.eligible(Pool::Group("bark"), &ctx, GameTime::START);

        match selector.select("bark", &ctx, GameTime::START) {
            Some(selection) => {
                prop_assert!(selection.node.predicates.matches(&ctx));
                prop_assert!(eligible.iter().any(|n| n.id == selection.node.id));
                let best = eligible.iter().map(|n| n.specificity()).max().unwrap_or(0);
                prop_assert_eq!(selection.specificity, best);
            }
            None => {
                prop_assert!(eligible.is_empty());
            }
        }
    }

    #[test]
    fn eligible_nodes_all_match(shapes in vec(node_shape(), 1..12), ctx in context()) {
        let selector = selector_for(&shapes, SelectionPolicy::default());
        let catalog = selector.catalog().snapshot();
        let eligible = selector.eligible(Pool::Group("bark"), &ctx, GameTime::START);

        for node in catalog.get_group("bark") {
            let listed = eligible.iter().any(|n| n.id == node.id);
            prop_assert_eq!(listed, node.predicates.matches(&ctx));
        }
    }

    #[test]
    fn repeated_peeks_agree(
        shapes in vec(node_shape(), 1..12),
        ctx in context(),
        seed in any::<u64>(),
        hour in 0_u64..1000,
    ) {
        let selector = selector_for(&shapes, SelectionPolicy::default()).with_seed(seed);
        let now = GameTime::from_hours(hour);
        let first = selector.select("bark", &ctx, now).map(|s| s.node.id.clone());
        let second = selector.select("bark", &ctx, now).map(|s| s.node.id.clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn caps_and_spacing_hold(
        daily in 1_u32..4,
        weekly in 1_u32..10,
        spacing in 0_u64..8,
        gaps in vec(0_u64..900, 1..60),
    ) {
        let shapes: Vec<_> = (0..4)
            .map(|_| NodeShape { armed: None, in_camp: None, tier: None, weight: 1.0 })
            .collect();
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited()
                .with_daily_cap(daily)
                .with_weekly_cap(weekly)
                .with_min_interval(GameDuration::from_hours(spacing)),
            ..SelectionPolicy::default()
        };
        // One group per node so their identical catch-all predicates coexist.
        let (catalog, _) = Catalog::from_nodes(
            shapes.iter().enumerate().map(|(i, s)| build_node(i, s).in_group(format!("g{}", i))),
        );
        let mut selector = Selector::new(CatalogHandle::new(catalog), policy);

        let mut per_day: HashMap<u64, u32> = HashMap::new();
        let mut per_week: HashMap<u64, u32> = HashMap::new();
        let mut last: Option<GameTime> = None;
        let mut now = GameTime::START;
        for gap in gaps {
            now = now + GameDuration::from_minutes(gap);
            if let Some(selection) = selector.select_any(&Context::empty(), now) {
                prop_assert!(selector.commit(&selection.node, now).is_ok());
                if let Some(previous) = last {
                    prop_assert!(now.since(previous) >= GameDuration::from_hours(spacing));
                }
                last = Some(now);
                *per_day.entry(now.day_index()).or_default() += 1;
                *per_week.entry(now.week_index()).or_default() += 1;
            } else {
                prop_assert!(!selector.can_fire(now));
            }
        }

        prop_assert!(per_day.values().all(|&n| n <= daily));
        prop_assert!(per_week.values().all(|&n| n <= weekly));
    }

    #[test]
    fn peeks_never_change_state(
        shapes in vec(node_shape(), 1..12),
        ctx in context(),
        hours in vec(0_u64..500, 1..20),
    ) {
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited()
                .with_daily_cap(2)
                .with_item_cooldown(GameDuration::from_days(1)),
            ..SelectionPolicy::default()
        };
        let mut selector = selector_for(&shapes, policy);
        if let Some(selection) = selector.select("bark", &ctx, GameTime::START) {
            prop_assert!(selector.commit(&selection.node, GameTime::START).is_ok());
        }
        let before = selector.save_state();

        for hour in hours {
            let now = GameTime::from_hours(hour);
            let _ = selector.select("bark", &ctx, now);
            let _ = selector.select_any(&ctx, now);
            let _ = selector.eligible(Pool::All, &ctx, now);
        }

        prop_assert_eq!(selector.save_state(), before);
    }

    #[test]
    fn restored_selector_decides_identically(
        shapes in vec(node_shape(), 1..12),
        ctx in context(),
        seed in any::<u64>(),
        commits in vec(0_u64..96, 0..10),
        checks in vec(0_u64..400, 1..10),
    ) {
        let policy = SelectionPolicy {
            pacing: PacingPolicy::unlimited()
                .with_daily_cap(3)
                .with_item_cooldown(GameDuration::from_days(1)),
            ..SelectionPolicy::default()
        };
        let mut original = selector_for(&shapes, policy).with_seed(seed);
        let mut commits = commits;
        commits.sort_unstable();
        for hour in commits {
            let now = GameTime::from_hours(hour);
            if let Some(selection) = original.select("bark", &ctx, now) {
                prop_assert!(original.commit(&selection.node, now).is_ok());
            }
        }

        let saved = serde_json::to_string(&original.save_state()).unwrap();
        let decoded: SelectorStateDto = serde_json::from_str(&saved).unwrap();
        let mut restored = selector_for(&shapes, policy).with_seed(seed);
        prop_assert!(restored.restore_state(&decoded).is_ok());

        for hour in checks {
            let now = GameTime::from_hours(hour);
            let a = original.select("bark", &ctx, now).map(|s| s.node.id.clone());
            let b = restored.select("bark", &ctx, now).map(|s| s.node.id.clone());
            prop_assert_eq!(a, b);
        }
    }
}
