//! Pacing limiter - global rate limits independent of which content fires.
//!
//! Counters are bucketed by calendar day and week of game time, not rolling
//! windows: `max_per_day` resets at midnight, so two firings late on one day
//! and two just after midnight all pass a cap of 2. Use `min_interval` to
//! keep firings apart across the boundary. Reading counters
//! (`can_fire`, `counters_at`) works on a normalized copy, so a peek never
//! changes stored state; only `record_fired` rolls counters over and
//! increments them.

use game_state::{GameDuration, GameTime};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// Rate limits for one selection domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PacingPolicyConfig", into = "PacingPolicyConfig")]
pub struct PacingPolicy {
    pub max_per_day: u32,
    pub max_per_week: u32,
    /// Minimum gap between any two firings.
    pub min_interval: GameDuration,
    /// Cooldown applied to a node's item key unless the node overrides it.
    pub per_item_cooldown: GameDuration,
    /// Cooldown applied to a node's category key when its scope includes it.
    pub per_category_cooldown: GameDuration,
}

impl PacingPolicy {
    /// No caps, no spacing, no cooldowns.
    pub fn unlimited() -> Self {
        Self {
            max_per_day: u32::MAX,
            max_per_week: u32::MAX,
            min_interval: GameDuration::ZERO,
            per_item_cooldown: GameDuration::ZERO,
            per_category_cooldown: GameDuration::ZERO,
        }
    }

    pub fn with_daily_cap(mut self, max: u32) -> Self {
        self.max_per_day = max;
        self
    }

    pub fn with_weekly_cap(mut self, max: u32) -> Self {
        self.max_per_week = max;
        self
    }

    pub fn with_min_interval(mut self, interval: GameDuration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_item_cooldown(mut self, cooldown: GameDuration) -> Self {
        self.per_item_cooldown = cooldown;
        self
    }

    pub fn with_category_cooldown(mut self, cooldown: GameDuration) -> Self {
        self.per_category_cooldown = cooldown;
        self
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Authored form of [`PacingPolicy`]; omitted caps are unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PacingPolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_per_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_per_week: Option<u32>,
    min_hours_between: f64,
    per_event_cooldown_days: f64,
    per_category_cooldown_days: f64,
}

impl From<PacingPolicyConfig> for PacingPolicy {
    fn from(config: PacingPolicyConfig) -> Self {
        Self {
            max_per_day: config.max_per_day.unwrap_or(u32::MAX),
            max_per_week: config.max_per_week.unwrap_or(u32::MAX),
            min_interval: GameDuration::from_hours_f64(config.min_hours_between),
            per_item_cooldown: GameDuration::from_days_f64(config.per_event_cooldown_days),
            per_category_cooldown: GameDuration::from_days_f64(config.per_category_cooldown_days),
        }
    }
}

impl From<PacingPolicy> for PacingPolicyConfig {
    fn from(policy: PacingPolicy) -> Self {
        let cap = |v: u32| (v != u32::MAX).then_some(v);
        Self {
            max_per_day: cap(policy.max_per_day),
            max_per_week: cap(policy.max_per_week),
            min_hours_between: policy.min_interval.as_hours_f64(),
            per_event_cooldown_days: policy.per_item_cooldown.as_days_f64(),
            per_category_cooldown_days: policy.per_category_cooldown.as_days_f64(),
        }
    }
}

/// Rolling counters and the time of the most recent firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacingState {
    pub fired_today: u32,
    pub fired_this_week: u32,
    pub current_day_index: u64,
    pub current_week_index: u64,
    /// `None` until the first firing.
    pub last_fired_at: Option<GameTime>,
}

impl PacingState {
    /// Counters as they stand at `now`, with day/week rollovers applied.
    pub fn normalized(&self, now: GameTime) -> PacingState {
        let mut state = *self;
        if now.day_index() != state.current_day_index {
            state.fired_today = 0;
            state.current_day_index = now.day_index();
        }
        if now.week_index() != state.current_week_index {
            state.fired_this_week = 0;
            state.current_week_index = now.week_index();
        }
        state
    }
}

/// Saved form of [`PacingState`]: five scalars. `last_fired_at` is game
/// minutes, or `-1` if nothing has fired yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingStateDto {
    pub fired_today: u32,
    pub fired_this_week: u32,
    pub current_day_index: i64,
    pub current_week_index: i64,
    pub last_fired_at: i64,
}

impl Default for PacingStateDto {
    fn default() -> Self {
        PacingState::default().into()
    }
}

impl From<PacingState> for PacingStateDto {
    fn from(state: PacingState) -> Self {
        Self {
            fired_today: state.fired_today,
            fired_this_week: state.fired_this_week,
            current_day_index: state.current_day_index as i64,
            current_week_index: state.current_week_index as i64,
            last_fired_at: state.last_fired_at.map_or(-1, |t| t.minutes() as i64),
        }
    }
}

impl TryFrom<PacingStateDto> for PacingState {
    type Error = PersistError;

    fn try_from(dto: PacingStateDto) -> Result<Self, Self::Error> {
        let non_negative = |field: &'static str, value: i64| {
            u64::try_from(value).map_err(|_| PersistError::Negative {
                what: "pacing state",
                field,
                value,
            })
        };
        Ok(Self {
            fired_today: dto.fired_today,
            fired_this_week: dto.fired_this_week,
            current_day_index: non_negative("current_day_index", dto.current_day_index)?,
            current_week_index: non_negative("current_week_index", dto.current_week_index)?,
            last_fired_at: (dto.last_fired_at >= 0)
                .then(|| GameTime::from_minutes(dto.last_fired_at as u64)),
        })
    }
}

/// Why pacing refused a firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingDenial {
    DailyCap,
    WeeklyCap,
    TooSoon { wait: GameDuration },
}

/// Enforces a [`PacingPolicy`] over a [`PacingState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacingLimiter {
    state: PacingState,
}

impl PacingLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: PacingState) -> Self {
        Self { state }
    }

    /// Stored state, without rollover applied.
    pub fn state(&self) -> &PacingState {
        &self.state
    }

    /// Counters as they stand at `now`.
    pub fn counters_at(&self, now: GameTime) -> PacingState {
        self.state.normalized(now)
    }

    /// Whether one more firing at `now` stays within `policy`.
    pub fn can_fire(&self, now: GameTime, policy: &PacingPolicy) -> bool {
        self.check(now, policy).is_ok()
    }

    /// Like [`can_fire`](Self::can_fire), reporting which limit applies.
    pub fn check(&self, now: GameTime, policy: &PacingPolicy) -> Result<(), PacingDenial> {
        let state = self.state.normalized(now);

        if state.fired_today >= policy.max_per_day {
            return Err(PacingDenial::DailyCap);
        }
        if state.fired_this_week >= policy.max_per_week {
            return Err(PacingDenial::WeeklyCap);
        }
        if let Some(last) = state.last_fired_at {
            let elapsed = now.since(last);
            if elapsed < policy.min_interval {
                return Err(PacingDenial::TooSoon {
                    wait: GameDuration::from_minutes(
                        policy.min_interval.minutes() - elapsed.minutes(),
                    ),
                });
            }
        }
        Ok(())
    }

    /// Count a firing at `now`.
    pub fn record_fired(&mut self, now: GameTime) {
        let mut state = self.state.normalized(now);
        state.fired_today = state.fired_today.saturating_add(1);
        state.fired_this_week = state.fired_this_week.saturating_add(1);
        state.last_fired_at = Some(now);
        self.state = state;
    }

    pub fn to_dto(&self) -> PacingStateDto {
        self.state.into()
    }

    pub fn from_dto(dto: PacingStateDto) -> Result<Self, PersistError> {
        Ok(Self::from_state(dto.try_into()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_firing_allowed() {
        let limiter = PacingLimiter::new();
        let policy = PacingPolicy::unlimited()
            .with_daily_cap(1)
            .with_min_interval(GameDuration::from_hours(6));
        assert!(limiter.can_fire(GameTime::START, &policy));
    }

    #[test]
    fn test_daily_cap_and_rollover() {
        let mut limiter = PacingLimiter::new();
        let policy = PacingPolicy::unlimited().with_daily_cap(2);

        limiter.record_fired(GameTime::at(0, 8, 0));
        limiter.record_fired(GameTime::at(0, 12, 0));
        assert_eq!(limiter.check(GameTime::at(0, 18, 0), &policy), Err(PacingDenial::DailyCap));

        assert!(limiter.can_fire(GameTime::at(1, 0, 0), &policy));
        assert_eq!(limiter.counters_at(GameTime::at(1, 0, 0)).fired_today, 0);
    }

    #[test]
    fn test_daily_cap_resets_at_midnight() {
        let mut limiter = PacingLimiter::new();
        let policy = PacingPolicy::unlimited().with_daily_cap(2);

        for (day, hour, minute) in [(0, 23, 0), (0, 23, 30), (1, 0, 10), (1, 0, 20)] {
            let now = GameTime::at(day, hour, minute);
            assert!(limiter.can_fire(now, &policy));
            limiter.record_fired(now);
        }
        assert_eq!(limiter.check(GameTime::at(1, 1, 0), &policy), Err(PacingDenial::DailyCap));

        let spaced = policy.with_min_interval(GameDuration::from_hours(2));
        let mut limiter = PacingLimiter::new();
        limiter.record_fired(GameTime::at(0, 23, 0));
        assert!(!limiter.can_fire(GameTime::at(1, 0, 10), &spaced));
        assert!(limiter.can_fire(GameTime::at(1, 1, 0), &spaced));
    }

    #[test]
    fn test_weekly_cap_and_rollover() {
        let mut limiter = PacingLimiter::new();
        let policy = PacingPolicy::unlimited().with_weekly_cap(3);

        for day in 0..3 {
            limiter.record_fired(GameTime::from_days(day));
        }
        assert_eq!(limiter.check(GameTime::from_days(5), &policy), Err(PacingDenial::WeeklyCap));
        assert!(limiter.can_fire(GameTime::from_days(7), &policy));
    }

    #[test]
    fn test_min_interval() {
        let mut limiter = PacingLimiter::new();
        let policy = PacingPolicy::unlimited().with_min_interval(GameDuration::from_hours(12));

        limiter.record_fired(GameTime::at(0, 6, 0));
        assert_eq!(
            limiter.check(GameTime::at(0, 10, 0), &policy),
            Err(PacingDenial::TooSoon { wait: GameDuration::from_hours(8) })
        );
        assert!(limiter.can_fire(GameTime::at(0, 18, 0), &policy));
    }

    #[test]
    fn test_can_fire_does_not_mutate() {
        let mut limiter = PacingLimiter::new();
        limiter.record_fired(GameTime::from_days(0));
        let before = limiter.clone();

        let _ = limiter.can_fire(GameTime::from_days(30), &PacingPolicy::unlimited());

        assert_eq!(limiter, before);
        assert_eq!(limiter.state().fired_today, 1);
    }

    #[test]
    fn test_record_rolls_over_before_counting() {
        let mut limiter = PacingLimiter::new();
        limiter.record_fired(GameTime::from_days(0));
        limiter.record_fired(GameTime::from_days(0));
        limiter.record_fired(GameTime::from_days(8));

        let state = limiter.state();
        assert_eq!(state.fired_today, 1);
        assert_eq!(state.fired_this_week, 1);
        assert_eq!(state.current_day_index, 8);
        assert_eq!(state.current_week_index, 1);
    }

    #[test]
    fn test_policy_from_config_fields() {
        let policy: PacingPolicy = toml::from_str(
            r#"
            max_per_day = 2
            min_hours_between = 6
            per_event_cooldown_days = 7
            per_category_cooldown_days = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(policy.max_per_day, 2);
        assert_eq!(policy.max_per_week, u32::MAX);
        assert_eq!(policy.min_interval, GameDuration::from_hours(6));
        assert_eq!(policy.per_item_cooldown, GameDuration::from_days(7));
        assert_eq!(policy.per_category_cooldown, GameDuration::from_hours(36));
    }

    #[test]
    fn test_dto_round_trip() {
        let mut limiter = PacingLimiter::new();
        limiter.record_fired(GameTime::at(3, 9, 15));

        let dto = limiter.to_dto();
        assert_eq!(dto.last_fired_at, GameTime::at(3, 9, 15).minutes() as i64);
        assert_eq!(PacingLimiter::from_dto(dto).unwrap(), limiter);

        let fresh = PacingLimiter::new().to_dto();
        assert_eq!(fresh.last_fired_at, -1);
        assert_eq!(PacingLimiter::from_dto(fresh).unwrap().state().last_fired_at, None);
    }

    #[test]
    fn test_dto_rejects_negative_index() {
        let dto = PacingStateDto {
            current_day_index: -3,
            ..PacingStateDto::default()
        };
        assert!(matches!(
            PacingLimiter::from_dto(dto),
            Err(PersistError::Negative { field: "current_day_index", .. })
        ));
    }
}
