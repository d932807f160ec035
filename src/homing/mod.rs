//! Homing cycle and limit switch handling.

mod cycle;
mod limits;

pub use cycle::{HomingCycle, HomingState};
pub use limits::{LimitDebouncer, LimitInputs, LimitSwitches};
