//! Motion segments and line requests.

use crate::config::units::MmPerMin;
use crate::config::{AxisMask, MotionConfig, N_AXIS};

/// Feed rate of a linear move.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedRate {
    /// Speed along the path.
    UnitsPerMinute(MmPerMin),
    /// The move completes in `1 / value` minutes.
    InverseTime(f32),
}

impl FeedRate {
    /// Raw numeric value.
    #[inline]
    pub fn value(self) -> f32 {
        match self {
            FeedRate::UnitsPerMinute(rate) => rate.0,
            FeedRate::InverseTime(rate) => rate,
        }
    }
}

/// A linear move to an absolute machine position.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineRequest {
    /// Target position in mm, X Y Z.
    pub target: [f32; N_AXIS],
    /// Feed rate of the move.
    pub feed_rate: FeedRate,
}

impl LineRequest {
    /// Move to `target` at `feed_rate` mm/min.
    pub fn new(target: [f32; N_AXIS], feed_rate: MmPerMin) -> Self {
        Self {
            target,
            feed_rate: FeedRate::UnitsPerMinute(feed_rate),
        }
    }

    /// Move to `target` at the configured default feed rate.
    pub fn at_default_feed(target: [f32; N_AXIS], motion: &MotionConfig) -> Self {
        Self::new(target, motion.default_feed_rate)
    }

    /// Rapid move to `target` at the configured seek rate.
    pub fn seek(target: [f32; N_AXIS], motion: &MotionConfig) -> Self {
        Self::new(target, motion.default_seek_rate)
    }

    /// Move to `target` in `1 / inverse_time` minutes.
    pub fn inverse_time(target: [f32; N_AXIS], inverse_time: f32) -> Self {
        Self {
            target,
            feed_rate: FeedRate::InverseTime(inverse_time),
        }
    }
}

/// A planned linear move.
///
/// Speeds are mm/min along the path; rates are step events per minute of the
/// dominant axis. Only `entry_speed` changes after the segment is queued.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionSegment {
    /// Absolute step count per axis.
    pub steps: [u32; N_AXIS],

    /// Axes moving in the negative direction.
    pub direction_bits: AxisMask,

    /// Step events of the dominant axis.
    pub step_event_count: u32,

    /// Target position in steps.
    pub target: [i32; N_AXIS],

    /// Path length in mm.
    pub millimeters: f32,

    /// Requested speed along the path.
    pub nominal_speed: f32,

    /// Step event rate at nominal speed.
    pub nominal_rate: u32,

    /// Planned speed at the start of the segment.
    pub entry_speed: f32,

    /// Cornering limit at the start of the segment.
    pub max_entry_speed: f32,

    /// Step rate change per acceleration tick.
    pub rate_delta: u32,

    /// The segment can decelerate from nominal speed to rest within its own length.
    pub is_nominal_length: bool,
}

impl MotionSegment {
    /// Placeholder for unused queue slots.
    pub const EMPTY: Self = Self {
        steps: [0; N_AXIS],
        direction_bits: AxisMask::NONE,
        step_event_count: 0,
        target: [0; N_AXIS],
        millimeters: 0.0,
        nominal_speed: 0.0,
        nominal_rate: 0,
        entry_speed: 0.0,
        max_entry_speed: 0.0,
        rate_delta: 0,
        is_nominal_length: false,
    };

    /// Steps on the given axis.
    #[inline]
    pub fn axis_steps(&self, axis: usize) -> u32 {
        self.steps[axis]
    }
}

impl Default for MotionSegment {
    fn default() -> Self {
        Self::EMPTY
    }
}
