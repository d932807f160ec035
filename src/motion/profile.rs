//! Velocity profile calculation.
//!
//! Provides trapezoidal velocity profiles expressed in step events per minute,
//! plus the constant-acceleration kinematics shared by the planner.

use libm::{ceilf, floorf, sqrtf};

/// Distance needed to change speed from `initial_rate` to `target_rate`
/// at the given constant acceleration (negative to decelerate).
///
/// Units only need to agree: mm with mm/min², or steps with steps/min².
#[inline]
pub fn estimate_acceleration_distance(initial_rate: f32, target_rate: f32, acceleration: f32) -> f32 {
    (target_rate * target_rate - initial_rate * initial_rate) / (2.0 * acceleration)
}

/// Point at which to stop accelerating and start decelerating so that a move
/// of length `distance` begins at `initial_rate` and ends at `final_rate`
/// without reaching its cruise rate.
#[inline]
pub fn intersection_distance(
    initial_rate: f32,
    final_rate: f32,
    acceleration: f32,
    distance: f32,
) -> f32 {
    (2.0 * acceleration * distance - initial_rate * initial_rate + final_rate * final_rate)
        / (4.0 * acceleration)
}

/// Highest speed from which `target_velocity` is still reachable within
/// `distance` at the given acceleration. Pass a negative acceleration to plan
/// a deceleration.
#[inline]
pub fn max_allowable_speed(acceleration: f32, target_velocity: f32, distance: f32) -> f32 {
    sqrtf(target_velocity * target_velocity - 2.0 * acceleration * distance)
}

/// Step rate corresponding to `speed` on a move whose `nominal_speed` maps to
/// `nominal_rate`, rounded up and floored at `minimum_rate`.
#[inline]
pub fn rate_for_speed(nominal_rate: u32, speed: f32, nominal_speed: f32, minimum_rate: u32) -> u32 {
    if nominal_speed <= 0.0 {
        return minimum_rate;
    }
    let rate = ceilf(nominal_rate as f32 * (speed / nominal_speed));
    (rate as u32).max(minimum_rate)
}

/// Current phase of a trapezoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionPhase {
    /// Ramping up toward the cruise rate.
    Accelerating,
    /// Holding the cruise rate.
    Cruising,
    /// Ramping down toward the final rate.
    Decelerating,
    /// Every step event has been emitted.
    Complete,
}

/// Trapezoidal velocity profile of one segment (or of the remainder of a
/// segment resumed after a hold).
///
/// Rates are step events per minute of the dominant axis. Step indices count
/// step events from the start of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VelocityProfile {
    /// Step events covered by this profile.
    pub step_event_count: u32,

    /// Stop accelerating once this many step events are done.
    pub accelerate_until: u32,

    /// Start decelerating once this many step events are done.
    pub decelerate_after: u32,

    /// Rate at the first step event.
    pub initial_rate: u32,

    /// Plateau rate.
    pub cruise_rate: u32,

    /// Rate reached at the last step event.
    pub final_rate: u32,

    /// Rate change applied per acceleration tick.
    pub rate_delta: u32,
}

impl VelocityProfile {
    /// Build a trapezoid that starts at `initial_rate`, cruises at
    /// `nominal_rate` and ends at `final_rate`.
    ///
    /// Initial and final rates must already be floored at the minimum step
    /// rate. If the move is too short to reach the cruise rate the plateau
    /// collapses to zero and the profile becomes triangular.
    pub fn trapezoid(
        step_event_count: u32,
        nominal_rate: u32,
        rate_delta: u32,
        initial_rate: u32,
        final_rate: u32,
        acceleration_ticks_per_second: u32,
    ) -> Self {
        let cruise_rate = nominal_rate.max(initial_rate).max(final_rate);

        if step_event_count == 0 {
            return Self {
                initial_rate,
                cruise_rate,
                final_rate,
                rate_delta,
                ..Self::default()
            };
        }

        let acceleration_per_minute =
            rate_delta as f32 * acceleration_ticks_per_second as f32 * 60.0;

        let (accelerate_steps, plateau_steps) = if acceleration_per_minute > 0.0 {
            let accelerate_steps = ceilf(estimate_acceleration_distance(
                initial_rate as f32,
                cruise_rate as f32,
                acceleration_per_minute,
            )) as i64;
            let decelerate_steps = floorf(estimate_acceleration_distance(
                cruise_rate as f32,
                final_rate as f32,
                -acceleration_per_minute,
            )) as i64;

            let plateau_steps = step_event_count as i64 - accelerate_steps - decelerate_steps;
            if plateau_steps < 0 {
                // Cruise rate is never reached
                let accelerate_steps = ceilf(intersection_distance(
                    initial_rate as f32,
                    final_rate as f32,
                    acceleration_per_minute,
                    step_event_count as f32,
                )) as i64;
                (accelerate_steps.clamp(0, step_event_count as i64), 0)
            } else {
                (accelerate_steps, plateau_steps)
            }
        } else {
            (0, step_event_count as i64)
        };

        let accelerate_until = accelerate_steps as u32;
        Self {
            step_event_count,
            accelerate_until,
            decelerate_after: accelerate_until + plateau_steps as u32,
            initial_rate,
            cruise_rate,
            final_rate,
            rate_delta,
        }
    }

    /// True if the profile has no plateau.
    #[inline]
    pub fn is_triangular(&self) -> bool {
        self.accelerate_until == self.decelerate_after
    }

    /// Phase after `step` step events.
    pub fn phase_at(&self, step: u32) -> MotionPhase {
        if step >= self.step_event_count {
            MotionPhase::Complete
        } else if step < self.accelerate_until {
            MotionPhase::Accelerating
        } else if step >= self.decelerate_after {
            MotionPhase::Decelerating
        } else {
            MotionPhase::Cruising
        }
    }
}
