//! Detachment risk from vessel speed

/// Chance factor of being shaken off a vessel moving at `speed`.
///
/// Linear between the two thresholds and unclamped: below
/// `min_speed` it is negative, above `max_speed` it exceeds 1. With equal
/// thresholds it is a step from 0 to 1 at the threshold.
pub fn detach_risk(speed: f32, min_speed: f32, max_speed: f32) -> f32 {
    let range = max_speed - min_speed;
    if range <= 0.0 {
        if speed >= min_speed { 1.0 } else { 0.0 }
    } else {
        (speed - min_speed) / range
    }
}

/// Whether a uniform draw in [0, 1) shakes the creature off
pub fn is_shaken_off(risk: f32, draw: f32) -> bool {
    draw < risk
}
