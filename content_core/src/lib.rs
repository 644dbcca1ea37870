//! # Content Core
//!
//! Picks the best-fitting piece of authored content for the current
//! situation without repeating content unfairly and without exceeding global
//! pacing limits. Conversation variants, situational opportunities and world
//! events all share the same machinery.
//!
//! ## Core Components
//!
//! - **predicate**: Constraint sets matched against a [`game_state::Context`]
//! - **catalog**: The immutable node table, its loader and hot-reload handle
//! - **cooldown** / **pacing**: Repetition and rate limits
//! - **engagement**: Bounded weight adjustment from shown/engaged counters
//! - **trigger**: Authored gate tokens such as `flag:x` or `morale < 30`
//! - **selector**: Filter, rank and tie-break; peek or commit
//! - **domains** / **engine**: Call-site adapters and the engine that owns them
//!
//! ## Peek vs. commit
//!
//! Selection never mutates anything. Only `commit` (and the engagement
//! `record_*` calls) change state, and only when the host says the content
//! was actually presented.

pub mod catalog;
pub mod config;
pub mod cooldown;
pub mod domains;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod node;
pub mod pacing;
pub mod persist;
pub mod predicate;
pub mod selector;
pub mod trigger;

pub use catalog::*;
pub use config::*;
pub use cooldown::*;
pub use domains::*;
pub use engagement::*;
pub use engine::*;
pub use error::*;
pub use node::*;
pub use pacing::*;
pub use persist::*;
pub use predicate::*;
pub use selector::*;
pub use trigger::*;

pub use game_state;
