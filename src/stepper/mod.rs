//! Stepper pulse generation.
//!
//! The scheduler consumes one planned segment at a time and turns it into
//! step and direction pulses through a [`StepperPort`].

mod axis;
mod port;
mod scheduler;

pub use axis::AxisPulseState;
pub use port::{HalStepperPort, StepperPort};
pub use scheduler::{SchedulerState, StepEvent, StepperScheduler};
