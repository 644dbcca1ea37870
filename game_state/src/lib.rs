//! # Game State
//!
//! The data side of the content engine: the game clock, the situational
//! [`Context`] handed to every selection call, and the [`WorldView`] that
//! trigger tokens are evaluated against. This crate holds no selection logic.

pub mod context;
pub mod time;
pub mod world_state;

pub use context::*;
pub use time::*;
pub use world_state::*;
