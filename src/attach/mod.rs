//! Creature attachment
//!
//! Latching creatures onto level walls and vessel hulls with a pair of weld
//! constraints, and shaking them off when the vessel moves fast enough.

mod acquisition;
mod config;
mod controller;
mod risk;
mod state;

pub use acquisition::{WALL_SEARCH_RADIUS, find_wall_target};
pub use config::{AttachConfig, ConfigError};
pub use controller::{
    ATTACH_DISTANCE_FACTOR, AttachContext, AttachmentController, DETACH_CHECK_INTERVAL,
    MAX_ANCHOR_DRIFT_SQUARED, RAYCAST_INTERVAL, REATTACH_COOLDOWN,
};
pub use risk::{detach_risk, is_shaken_off};
pub use state::{AttachError, AttachTarget, Attachment, DetachCause, LatchState};
