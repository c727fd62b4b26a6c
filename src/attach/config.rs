//! Attachment configuration loaded from creature definitions

use std::fmt;
use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::creature::{LimbType, Ragdoll};

/// How a creature latches onto walls and vessels.
///
/// Loaded once when the creature's AI is created.
///
/// # Example
///
/// ```ignore
/// let config = AttachConfig::from_ron(r#"(
///     attach_to_walls: true,
///     min_deattach_speed: 2.0,
///     attach_limb: "Jaw",
/// )"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    /// Latch onto level walls while idle
    pub attach_to_walls: bool,
    /// Latch onto vessels while attacking them
    pub attach_to_vessel: bool,
    /// Vessel speed at which detachment becomes possible
    pub min_deattach_speed: f32,
    /// Vessel speed at which detachment is certain
    pub max_deattach_speed: f32,
    /// Damage taken when shaken off
    pub damage_on_detach: f32,
    /// Stun applied when shaken off
    pub detach_stun: f32,
    /// Attach point in the attach limb's local space, before limb scaling
    pub local_attach_pos: (f32, f32),
    /// Extra rotation of the attach limb in degrees
    pub attach_limb_rotation: f32,
    /// Name of the limb that holds on
    pub attach_limb: String,
    /// Seed for detachment draws; entropy when absent
    pub seed: Option<u64>,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            attach_to_walls: false,
            attach_to_vessel: false,
            min_deattach_speed: 3.0,
            max_deattach_speed: 10.0,
            damage_on_detach: 0.0,
            detach_stun: 0.0,
            local_attach_pos: (0.0, 0.0),
            attach_limb_rotation: 0.0,
            attach_limb: String::from("Head"),
            seed: None,
        }
    }
}

impl AttachConfig {
    pub fn with_attach_to_walls(mut self, enabled: bool) -> Self {
        self.attach_to_walls = enabled;
        self
    }

    pub fn with_attach_to_vessel(mut self, enabled: bool) -> Self {
        self.attach_to_vessel = enabled;
        self
    }

    /// Set the detachment speed range
    pub fn with_deattach_speeds(mut self, min: f32, max: f32) -> Self {
        self.min_deattach_speed = min;
        self.max_deattach_speed = max;
        self
    }

    /// Set damage and stun applied when shaken off
    pub fn with_detach_damage(mut self, damage: f32, stun: f32) -> Self {
        self.damage_on_detach = damage;
        self.detach_stun = stun;
        self
    }

    pub fn with_local_attach_pos(mut self, pos: Vec2) -> Self {
        self.local_attach_pos = (pos.x, pos.y);
        self
    }

    /// Set the attach limb rotation in degrees
    pub fn with_attach_limb_rotation(mut self, degrees: f32) -> Self {
        self.attach_limb_rotation = degrees;
        self
    }

    pub fn with_attach_limb(mut self, limb: impl Into<String>) -> Self {
        self.attach_limb = limb.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn local_attach_pos(&self) -> Vec2 {
        Vec2::new(self.local_attach_pos.0, self.local_attach_pos.1)
    }

    pub fn attach_limb_rotation_radians(&self) -> f32 {
        self.attach_limb_rotation.to_radians()
    }

    /// Check value ranges and normalize the speed range.
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold or damage value is negative or not finite
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let checks = [
            ("min_deattach_speed", self.min_deattach_speed),
            ("max_deattach_speed", self.max_deattach_speed),
            ("damage_on_detach", self.damage_on_detach),
            ("detach_stun", self.detach_stun),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }

        self.max_deattach_speed = self.max_deattach_speed.max(self.min_deattach_speed);
        Ok(self)
    }

    /// Limb that holds on, falling back to the ragdoll's main limb when the
    /// configured name is unknown or the ragdoll has no such limb
    pub fn resolve_attach_limb(&self, ragdoll: &Ragdoll) -> LimbType {
        match self.attach_limb.parse::<LimbType>() {
            Ok(limb) if ragdoll.limb(limb).is_some() => limb,
            Ok(limb) => {
                log::warn!(
                    "Attach limb {limb} not found in ragdoll, using {}",
                    ragdoll.main_limb_type()
                );
                ragdoll.main_limb_type()
            }
            Err(e) => {
                log::warn!("{e}, using {}", ragdoll.main_limb_type());
                ragdoll.main_limb_type()
            }
        }
    }

    /// Parse a configuration from RON
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or a value is out of range
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: AttachConfig =
            ron::from_str(source).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validated()
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_ron(&content)
    }

    /// Parse a configuration from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or a value is out of range
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: AttachConfig =
            serde_json::from_str(source).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validated()
    }
}

/// Errors that can occur when loading an attachment configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading the file
    IoError(String),
    /// Error parsing the data
    ParseError(String),
    /// A value is out of its valid range
    InvalidValue { field: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::ParseError(e) => write!(f, "Parse error: {e}"),
            Self::InvalidValue { field, value } => write!(f, "Invalid {field}: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}
