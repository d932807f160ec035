//! Planner feed and acceleration settings.

use serde::Deserialize;

use super::units::{Millimeters, MmPerMin, MmPerMinSquared};

/// Feed-rate, acceleration and cornering parameters consumed by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct MotionConfig {
    /// Feed rate used when a request carries none.
    pub default_feed_rate: MmPerMin,

    /// Rapid traverse rate.
    pub default_seek_rate: MmPerMin,

    /// Acceleration limit applied along every segment.
    pub acceleration: MmPerMinSquared,

    /// Maximum path deviation tolerated when cornering.
    pub junction_deviation: Millimeters,

    /// Speed planned at the end of the buffer and at every stop.
    pub minimum_planner_speed: MmPerMin,
}

impl Default for MotionConfig {
    fn default() -> Self {
        let default_feed_rate = MmPerMin(250.0);
        Self {
            default_feed_rate,
            default_seek_rate: MmPerMin(500.0),
            acceleration: MmPerMinSquared(default_feed_rate.0 * 60.0 * 60.0 / 10.0),
            junction_deviation: Millimeters(0.05),
            minimum_planner_speed: MmPerMin(0.0),
        }
    }
}
