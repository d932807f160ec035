//! Motion module for cnc-motion.
//!
//! Provides the velocity profile math shared by the planner and the
//! scheduler, and the per-tick rate tracking of a running trapezoid.

mod executor;
mod profile;

pub use executor::TrapezoidGenerator;
pub use profile::{
    estimate_acceleration_distance, intersection_distance, max_allowable_speed, rate_for_speed,
    MotionPhase, VelocityProfile,
};
