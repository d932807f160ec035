//! Status report formatting.

use core::fmt::{self, Write};

use crate::config::units::Millimeters;
use crate::config::{ReportConfig, N_AXIS};
use crate::system::MachineState;

/// Longest rendered report.
pub const STATUS_REPORT_CAPACITY: usize = 64;

/// Snapshot of machine state and position, rendered as
/// `<State,MPos:x,y,z>`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    /// Machine state.
    pub state: MachineState,
    /// Machine position in mm.
    pub position_mm: [f32; N_AXIS],
    /// Digits after the decimal point.
    pub decimal_places: u8,
    /// Report in inches.
    pub inches: bool,
}

impl StatusReport {
    /// Build a report with the configured formatting.
    pub fn new(state: MachineState, position_mm: [f32; N_AXIS], report: &ReportConfig) -> Self {
        Self {
            state,
            position_mm,
            decimal_places: report.decimal_places,
            inches: report.inches,
        }
    }

    /// Render into a fixed-capacity string.
    ///
    /// # Errors
    ///
    /// Returns `fmt::Error` if the report does not fit.
    pub fn render(&self) -> Result<heapless::String<STATUS_REPORT_CAPACITY>, fmt::Error> {
        let mut out = heapless::String::new();
        write!(out, "{}", self)?;
        Ok(out)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let places = self.decimal_places as usize;
        write!(f, "<{},MPos:", self.state.name())?;
        for (i, mm) in self.position_mm.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            let value = if self.inches {
                Millimeters(*mm).to_inches()
            } else {
                *mm
            };
            write!(f, "{:.*}", places, value)?;
        }
        f.write_char('>')
    }
}
