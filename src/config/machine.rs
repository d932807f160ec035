//! Machine configuration - root configuration structure.

use serde::Deserialize;

use super::axis::{Axis, N_AXIS};
use super::homing::HomingConfig;
use super::motion::MotionConfig;
use super::runtime::RuntimeCommands;
use super::stepper::StepperConfig;

/// Microstepping of the stock drivers.
const DEFAULT_MICROSTEPS: f32 = 4.0;

/// Full steps per mm of the stock lead screws.
const DEFAULT_FULL_STEPS_PER_MM: f32 = 94.488_19;

/// Per-axis mechanical scale.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct AxisConfig {
    /// Steps per millimeter of travel.
    pub steps_per_mm: f32,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            steps_per_mm: DEFAULT_FULL_STEPS_PER_MM * DEFAULT_MICROSTEPS,
        }
    }
}

/// The three linear axes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct AxesConfig {
    /// X axis.
    pub x: AxisConfig,
    /// Y axis.
    pub y: AxisConfig,
    /// Z axis.
    pub z: AxisConfig,
}

impl AxesConfig {
    /// Get one axis by identifier.
    pub fn axis(&self, axis: Axis) -> &AxisConfig {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// Steps per mm of every axis, in index order.
    pub fn steps_per_mm(&self) -> [f32; N_AXIS] {
        [self.x.steps_per_mm, self.y.steps_per_mm, self.z.steps_per_mm]
    }
}

/// Status report formatting.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ReportConfig {
    /// Digits after the decimal point.
    pub decimal_places: u8,
    /// Report positions in inches.
    pub inches: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            decimal_places: 3,
            inches: false,
        }
    }
}

/// Root configuration, read-only once the motion system is built.
///
/// Every component borrows it at construction, so planner and scheduler can be
/// exercised in isolation with synthetic parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct MachineConfig {
    /// Axis scales.
    pub axes: AxesConfig,

    /// Feed rates, acceleration and cornering.
    pub motion: MotionConfig,

    /// Pulse timing and scheduler rates.
    pub stepper: StepperConfig,

    /// Homing and limit switches.
    pub homing: HomingConfig,

    /// Reserved runtime command bytes.
    pub runtime: RuntimeCommands,

    /// Status report formatting.
    pub report: ReportConfig,
}

impl MachineConfig {
    /// Steps per mm of every axis, in index order.
    #[inline]
    pub fn steps_per_mm(&self) -> [f32; N_AXIS] {
        self.axes.steps_per_mm()
    }
}
