//! Core module
//!
//! Contains the event queue shared by gameplay systems

mod events;

pub use events::{EventQueue, GameEvent};
