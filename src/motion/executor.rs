//! Trapezoid execution - per-tick step rate tracking.

use super::profile::{MotionPhase, VelocityProfile};

/// Tracks the instantaneous step rate of a [`VelocityProfile`] while it runs.
///
/// The rate is only changed on acceleration ticks, a fixed subdivision of the
/// scheduler tick, so the ramp slope is independent of the step rate.
#[derive(Debug, Clone)]
pub struct TrapezoidGenerator {
    /// The profile being executed.
    profile: VelocityProfile,

    /// Current step rate in step events per minute.
    rate: u32,

    /// Scheduler ticks accumulated toward the next acceleration tick.
    tick_counter: u32,

    /// Scheduler ticks per acceleration tick.
    ticks_per_acceleration_tick: u32,

    /// Hard lower bound on the rate.
    minimum_rate: u32,

    /// Hard upper bound on the rate (one step event per tick).
    maximum_rate: u32,

    /// Deceleration phase has been entered.
    decelerating: bool,

    /// Current phase.
    phase: MotionPhase,
}

impl TrapezoidGenerator {
    /// Create an idle generator.
    pub fn new(ticks_per_acceleration_tick: u32, minimum_rate: u32, maximum_rate: u32) -> Self {
        Self {
            profile: VelocityProfile::default(),
            rate: 0,
            tick_counter: 0,
            ticks_per_acceleration_tick: ticks_per_acceleration_tick.max(1),
            minimum_rate,
            maximum_rate: maximum_rate.max(minimum_rate),
            decelerating: false,
            phase: MotionPhase::Complete,
        }
    }

    /// Start executing a profile at its initial rate.
    pub fn start(&mut self, profile: VelocityProfile) {
        self.start_at(profile, profile.initial_rate);
    }

    /// Start executing a profile from an arbitrary rate, clamped to the
    /// profile's cruise rate.
    pub fn start_at(&mut self, profile: VelocityProfile, rate: u32) {
        self.profile = profile;
        self.decelerating = false;
        self.phase = profile.phase_at(0);
        // Midpoint rule: first update lands half an acceleration tick in
        self.tick_counter = self.ticks_per_acceleration_tick / 2;
        self.rate = self.clamp(rate.min(self.cruise_rate()));
    }

    /// Current step rate in step events per minute.
    #[inline]
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    /// Profile being executed.
    #[inline]
    pub fn profile(&self) -> &VelocityProfile {
        &self.profile
    }

    /// Upper bound of the rate for the current profile.
    #[inline]
    pub fn cruise_rate(&self) -> u32 {
        self.profile
            .cruise_rate
            .max(self.minimum_rate)
            .min(self.maximum_rate)
    }

    /// Advance one scheduler tick with `step` step events done in this profile.
    ///
    /// Returns the rate to use for the next tick.
    pub fn tick(&mut self, step: u32) -> u32 {
        self.phase = self.profile.phase_at(step);
        let delta = self.profile.rate_delta;

        match self.phase {
            MotionPhase::Accelerating => {
                if self.iterate() {
                    self.rate = self.rate.saturating_add(delta).min(self.cruise_rate());
                }
            }
            MotionPhase::Cruising => {
                self.rate = self.cruise_rate();
            }
            MotionPhase::Decelerating => {
                if !self.decelerating {
                    self.decelerating = true;
                    self.tick_counter = self.ticks_per_acceleration_tick / 2;
                } else if self.iterate() {
                    self.rate = if self.rate > delta {
                        self.rate - delta
                    } else {
                        (self.rate + 1) / 2
                    };
                    self.rate = self.rate.max(self.profile.final_rate);
                }
            }
            MotionPhase::Complete => {}
        }

        self.rate = self.clamp(self.rate);
        self.rate
    }

    /// Advance one scheduler tick of a feed hold, ignoring the profile.
    ///
    /// Returns `true` once the rate is low enough to stop without losing steps.
    pub fn hold_tick(&mut self) -> bool {
        self.phase = MotionPhase::Decelerating;
        if self.iterate() {
            let delta = self.profile.rate_delta;
            if self.rate <= self.minimum_rate.max(delta) {
                return true;
            }
            self.rate = self.clamp(self.rate.saturating_sub(delta));
        }
        false
    }

    fn iterate(&mut self) -> bool {
        self.tick_counter += 1;
        if self.tick_counter >= self.ticks_per_acceleration_tick {
            self.tick_counter -= self.ticks_per_acceleration_tick;
            true
        } else {
            false
        }
    }

    #[inline]
    fn clamp(&self, rate: u32) -> u32 {
        rate.clamp(self.minimum_rate, self.maximum_rate)
    }
}
