//! Per-axis Bresenham state.

/// Step distribution and position of one axis.
///
/// Each step event of the dominant axis adds the axis' own step count to the
/// error accumulator; an overflow emits one step on this axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisPulseState {
    /// Bresenham error accumulator.
    counter: i64,
    /// Steps emitted in the current segment.
    steps_taken: u32,
    /// Absolute position in steps.
    position: i32,
}

impl AxisPulseState {
    /// Create an axis at `position`.
    pub const fn at(position: i32) -> Self {
        Self {
            counter: 0,
            steps_taken: 0,
            position,
        }
    }

    /// Prepare for a segment with `step_event_count` step events.
    #[inline]
    pub fn start_segment(&mut self, step_event_count: u32) {
        self.counter = -((step_event_count / 2) as i64);
        self.steps_taken = 0;
    }

    /// Advance by one step event. Returns `true` if this axis steps.
    #[inline]
    pub fn advance(&mut self, axis_steps: u32, step_event_count: u32, negative: bool) -> bool {
        self.counter += axis_steps as i64;
        if self.counter > 0 {
            self.counter -= step_event_count as i64;
            self.steps_taken += 1;
            self.position += if negative { -1 } else { 1 };
            true
        } else {
            false
        }
    }

    /// Absolute position in steps.
    #[inline]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Overwrite the absolute position.
    #[inline]
    pub fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    /// Steps emitted in the current segment.
    #[inline]
    pub fn steps_taken(&self) -> u32 {
        self.steps_taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(axis_steps: u32, step_event_count: u32, negative: bool) -> (AxisPulseState, u32) {
        let mut axis = AxisPulseState::at(0);
        axis.start_segment(step_event_count);
        let mut pulses = 0;
        for _ in 0..step_event_count {
            if axis.advance(axis_steps, step_event_count, negative) {
                pulses += 1;
            }
        }
        (axis, pulses)
    }

    #[test]
    fn test_exact_step_count() {
        for (steps, events) in [(0, 10), (1, 10), (3, 7), (7, 7), (299, 1_000)] {
            let (axis, pulses) = run(steps, events, false);
            assert_eq!(pulses, steps);
            assert_eq!(axis.steps_taken(), steps);
            assert_eq!(axis.position(), steps as i32);
        }
    }

    #[test]
    fn test_negative_direction() {
        let (axis, _) = run(5, 10, true);
        assert_eq!(axis.position(), -5);
    }

    #[test]
    fn test_steps_spread_evenly() {
        let mut axis = AxisPulseState::at(0);
        axis.start_segment(10);
        let pattern: Vec<bool> = (0..10).map(|_| axis.advance(5, 10, false)).collect();
        // Every other event steps
        assert_eq!(pattern.iter().filter(|&&s| s).count(), 5);
        assert!(pattern.windows(2).all(|w| w[0] != w[1]));
    }
}
