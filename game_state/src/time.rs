//! Game clock: absolute timestamps, durations and calendar helpers.
//!
//! Time is tracked as whole minutes since the start of the campaign so that
//! timestamps survive a save/load cycle as a single integer.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const DAYS_PER_WEEK: u64 = 7;
pub const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY;

/// An absolute point in game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct GameTime {
    minutes: u64,
}

impl GameTime {
    /// The first minute of the campaign.
    pub const START: GameTime = GameTime { minutes: 0 };

    pub fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    pub fn from_hours(hours: u64) -> Self {
        Self::from_minutes(hours * MINUTES_PER_HOUR)
    }

    pub fn from_days(days: u64) -> Self {
        Self::from_minutes(days * MINUTES_PER_DAY)
    }

    /// Create a timestamp from calendar components.
    pub fn at(day: u64, hour: u8, minute: u8) -> Self {
        Self::from_minutes(
            day * MINUTES_PER_DAY + hour as u64 * MINUTES_PER_HOUR + minute as u64,
        )
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    /// Zero-based index of the day containing this timestamp.
    pub fn day_index(&self) -> u64 {
        self.minutes / MINUTES_PER_DAY
    }

    /// Zero-based index of the week containing this timestamp.
    pub fn week_index(&self) -> u64 {
        self.day_index() / DAYS_PER_WEEK
    }

    pub fn hour_of_day(&self) -> u8 {
        ((self.minutes / MINUTES_PER_HOUR) % HOURS_PER_DAY) as u8
    }

    pub fn minute_of_hour(&self) -> u8 {
        (self.minutes % MINUTES_PER_HOUR) as u8
    }

    /// Check if it's currently night.
    pub fn is_night(&self) -> bool {
        let hour = self.hour_of_day();
        hour < 6 || hour >= 20
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour_of_day())
    }

    /// Season changes every 90 days on a 360-day year.
    pub fn season(&self) -> Season {
        match self.day_index() % 360 {
            0..=89 => Season::Spring,
            90..=179 => Season::Summer,
            180..=269 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Time elapsed since `earlier`. Zero if `earlier` lies in the future.
    pub fn since(&self, earlier: GameTime) -> GameDuration {
        GameDuration::from_minutes(self.minutes.saturating_sub(earlier.minutes))
    }
}

impl Add<GameDuration> for GameTime {
    type Output = GameTime;

    fn add(self, rhs: GameDuration) -> GameTime {
        GameTime::from_minutes(self.minutes.saturating_add(rhs.minutes))
    }
}

impl Sub<GameTime> for GameTime {
    type Output = GameDuration;

    fn sub(self, rhs: GameTime) -> GameDuration {
        self.since(rhs)
    }
}

impl std::fmt::Display for GameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "day {} {:02}:{:02}",
            self.day_index(),
            self.hour_of_day(),
            self.minute_of_hour()
        )
    }
}

/// A span of game time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct GameDuration {
    minutes: u64,
}

impl GameDuration {
    pub const ZERO: GameDuration = GameDuration { minutes: 0 };

    pub fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    pub fn from_hours(hours: u64) -> Self {
        Self::from_minutes(hours * MINUTES_PER_HOUR)
    }

    pub fn from_days(days: u64) -> Self {
        Self::from_minutes(days * MINUTES_PER_DAY)
    }

    /// Fractional hours as authored in configuration, rounded to the minute.
    /// Negative and non-finite inputs collapse to zero.
    pub fn from_hours_f64(hours: f64) -> Self {
        Self::from_fractional_minutes(hours * MINUTES_PER_HOUR as f64)
    }

    /// Fractional days as authored in configuration, rounded to the minute.
    pub fn from_days_f64(days: f64) -> Self {
        Self::from_fractional_minutes(days * MINUTES_PER_DAY as f64)
    }

    fn from_fractional_minutes(minutes: f64) -> Self {
        if minutes.is_finite() && minutes > 0.0 {
            Self::from_minutes(minutes.round() as u64)
        } else {
            Self::ZERO
        }
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    pub fn as_hours_f64(&self) -> f64 {
        self.minutes as f64 / MINUTES_PER_HOUR as f64
    }

    pub fn as_days_f64(&self) -> f64 {
        self.minutes as f64 / MINUTES_PER_DAY as f64
    }

    pub fn is_zero(&self) -> bool {
        self.minutes == 0
    }
}

impl Add for GameDuration {
    type Output = GameDuration;

    fn add(self, rhs: GameDuration) -> GameDuration {
        GameDuration::from_minutes(self.minutes.saturating_add(rhs.minutes))
    }
}

/// Coarse part of the day, exposed to content as the `time_of_day` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u8) -> Self {
        match hour {
            5..=6 => TimeOfDay::Dawn,
            7..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=19 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

/// Seasons of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}
