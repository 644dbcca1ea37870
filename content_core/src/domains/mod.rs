//! Call-site adapters: one thin wrapper per feature over a [`Selector`].
//!
//! [`Selector`]: crate::selector::Selector

pub mod dialogue;
pub mod opportunity;
pub mod world_event;

pub use dialogue::*;
pub use opportunity::*;
pub use world_event::*;
