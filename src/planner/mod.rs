//! Look-ahead motion planner.
//!
//! Buffers linear moves in a fixed-capacity queue and keeps their junction
//! speeds consistent with the acceleration limit across the whole buffered
//! horizon.

mod junction;
mod queue;
mod segment;

pub use junction::{forward_kernel, junction_speed, reverse_kernel};
pub use queue::{SegmentQueue, SEGMENT_QUEUE_CAPACITY};
pub use segment::{FeedRate, LineRequest, MotionSegment};

use libm::{ceilf, sqrtf};

use crate::config::units::{Millimeters, Steps};
use crate::config::{AxisMask, MachineConfig, N_AXIS};
use crate::error::{InvalidSegment, PlannerError};
use crate::motion::max_allowable_speed;

/// Motion planner over a queue of `N` segments.
///
/// The planner owns every queued segment until the scheduler takes it with
/// [`Planner::dequeue_for_execution`]. The segment in flight still takes part
/// in planning: its direction and speed limit the junction with the next
/// segment, and its exit speed follows the front segment's entry speed until
/// the scheduler commits it with [`Planner::commit_exit_speed`]. From then on
/// the front entry speed is never raised again.
#[derive(Debug, Clone)]
pub struct Planner<'a, const N: usize = SEGMENT_QUEUE_CAPACITY> {
    config: &'a MachineConfig,
    queue: SegmentQueue<N>,
    /// Planned position (end of the newest segment), in steps.
    position: [i32; N_AXIS],
    previous_unit_vec: [f32; N_AXIS],
    previous_nominal_speed: f32,
    in_flight: InFlight,
}

/// Planning state of the segment handed to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InFlight {
    /// Nothing executing.
    Idle,
    /// Executing; the exit speed may still rise up to `exit_limit`, the
    /// fastest speed reachable from its entry speed.
    Open { exit_limit: f32 },
    /// Executing and slowing down to this exit speed.
    Committed(f32),
}

impl<'a, const N: usize> Planner<'a, N> {
    /// Create an empty planner at the machine origin.
    pub fn new(config: &'a MachineConfig) -> Self {
        Self {
            config,
            queue: SegmentQueue::new(),
            position: [0; N_AXIS],
            previous_unit_vec: [0.0; N_AXIS],
            previous_nominal_speed: 0.0,
            in_flight: InFlight::Idle,
        }
    }

    /// Number of queued segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no segment is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if the next enqueue would fail with `QueueFull`.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Queued segments, oldest first.
    #[inline]
    pub fn segments(&self) -> impl Iterator<Item = &MotionSegment> + '_ {
        self.queue.iter()
    }

    /// Check if a segment handed to the scheduler has not finished yet.
    #[inline]
    pub fn has_segment_in_flight(&self) -> bool {
        self.in_flight != InFlight::Idle
    }

    /// Planned position in steps.
    #[inline]
    pub fn position(&self) -> [i32; N_AXIS] {
        self.position
    }

    /// Planned position in mm.
    pub fn position_mm(&self) -> [f32; N_AXIS] {
        let steps_per_mm = self.config.steps_per_mm();
        let mut mm = [0.0; N_AXIS];
        for (i, value) in mm.iter_mut().enumerate() {
            *value = Steps(self.position[i]).to_mm(steps_per_mm[i]).0;
        }
        mm
    }

    /// Overwrite the planned position, e.g. after an abort or homing.
    pub fn set_position(&mut self, position: [i32; N_AXIS]) {
        self.position = position;
    }

    /// Plan a linear move from the current planned position.
    ///
    /// # Errors
    ///
    /// - `InvalidSegment` if the target is not finite, the feed rate is not
    ///   positive, or the move is shorter than one step on every axis.
    /// - `QueueFull` if the queue is at capacity; nothing is changed and the
    ///   caller should retry once the scheduler has consumed a segment.
    pub fn enqueue(&mut self, request: &LineRequest) -> Result<(), PlannerError> {
        let segment = self.build_segment(request)?;

        if self.queue.is_full() {
            #[cfg(feature = "defmt")]
            defmt::debug!("planner: queue full");
            return Err(PlannerError::QueueFull);
        }

        let unit_vec = self.unit_vector(&segment);
        let motion = &self.config.motion;
        let acceleration = motion.acceleration.0;
        let minimum_speed = motion.minimum_planner_speed.0;

        // Junction with the previous segment; only valid while it is still
        // buffered or running.
        let connected = !self.queue.is_empty() || self.has_segment_in_flight();
        let mut vmax_junction = if connected && self.previous_nominal_speed > 0.0 {
            junction_speed(
                &self.previous_unit_vec,
                &unit_vec,
                self.previous_nominal_speed,
                segment.nominal_speed,
                acceleration,
                motion.junction_deviation.0,
                minimum_speed,
            )
        } else {
            minimum_speed
        };
        if let (true, InFlight::Committed(exit_speed)) = (self.queue.is_empty(), self.in_flight) {
            // Segment in flight is already slowing down to its exit speed
            vmax_junction = vmax_junction.min(exit_speed);
        }

        let max_entry_speed = vmax_junction.min(segment.nominal_speed);
        let v_allowable = max_allowable_speed(-acceleration, minimum_speed, segment.millimeters);

        let segment = MotionSegment {
            max_entry_speed,
            entry_speed: max_entry_speed.min(v_allowable),
            is_nominal_length: segment.nominal_speed <= v_allowable,
            ..segment
        };

        self.queue.push(segment)?;
        self.previous_unit_vec = unit_vec;
        self.previous_nominal_speed = segment.nominal_speed;
        self.position = segment.target;

        self.recompute_junction_speeds();
        Ok(())
    }

    /// Re-plan entry speeds over the whole queue.
    ///
    /// Walks backward from the newest segment so each segment can still slow
    /// down to its successor's entry speed, then forward so no entry speed
    /// exceeds what its predecessor can accelerate to. The segment in flight
    /// is the front segment's predecessor. A committed front segment is
    /// never raised.
    pub fn recompute_junction_speeds(&mut self) {
        let len = self.queue.len();
        if len == 0 {
            return;
        }
        let acceleration = self.config.motion.acceleration.0;
        let first = usize::from(matches!(self.in_flight, InFlight::Committed(_)));

        for i in (first..len - 1).rev() {
            let next = self.queue.get(i + 1).copied();
            if let (Some(next), Some(current)) = (next, self.queue.get_mut(i)) {
                reverse_kernel(current, &next, acceleration);
            }
        }

        if let (InFlight::Open { exit_limit }, Some(front)) = (self.in_flight, self.queue.get_mut(0)) {
            front.entry_speed = front.entry_speed.min(exit_limit);
        }

        for i in 1..len {
            let previous = self.queue.get(i - 1).copied();
            if let (Some(previous), Some(current)) = (previous, self.queue.get_mut(i)) {
                forward_kernel(&previous, current, acceleration);
            }
        }
    }

    /// Hand the oldest segment to the scheduler.
    ///
    /// The segment stays in flight until [`Planner::finish_execution`]; its
    /// exit speed is read with [`Planner::exit_speed`].
    ///
    /// # Errors
    ///
    /// Returns `QueueEmpty` when no segment is waiting.
    pub fn dequeue_for_execution(&mut self) -> Result<MotionSegment, PlannerError> {
        let segment = self.queue.pop().ok_or(PlannerError::QueueEmpty)?;
        let acceleration = self.config.motion.acceleration.0;
        self.in_flight = InFlight::Open {
            exit_limit: max_allowable_speed(-acceleration, segment.entry_speed, segment.millimeters),
        };
        self.recompute_junction_speeds();
        Ok(segment)
    }

    /// Planned exit speed of the segment in flight: the front segment's
    /// entry speed, or the minimum planner speed if nothing follows.
    pub fn exit_speed(&self) -> f32 {
        match (self.in_flight, self.queue.front()) {
            (_, Some(front)) => front.entry_speed,
            (InFlight::Committed(speed), None) => speed,
            _ => self.config.motion.minimum_planner_speed.0,
        }
    }

    /// Fix the exit speed of the segment in flight, at most `reachable`.
    ///
    /// The front segment's entry speed is lowered to match if needed and is
    /// not raised by later look-ahead. Calling it again can only lower the
    /// speed further. Returns the committed speed.
    pub fn commit_exit_speed(&mut self, reachable: f32) -> f32 {
        let speed = match self.queue.get_mut(0) {
            Some(front) => {
                front.entry_speed = front.entry_speed.min(reachable);
                front.entry_speed
            }
            None => self.config.motion.minimum_planner_speed.0,
        };
        self.in_flight = InFlight::Committed(speed);
        self.recompute_junction_speeds();
        speed
    }

    /// Mark the segment in flight as done.
    #[inline]
    pub fn finish_execution(&mut self) {
        self.in_flight = InFlight::Idle;
    }

    /// Drop every queued segment and forget the previous direction.
    ///
    /// The planned position is kept; callers that aborted motion must
    /// resynchronise it with [`Planner::set_position`].
    pub fn reset(&mut self) {
        self.queue.clear();
        self.previous_unit_vec = [0.0; N_AXIS];
        self.previous_nominal_speed = 0.0;
        self.in_flight = InFlight::Idle;
    }

    fn build_segment(&self, request: &LineRequest) -> Result<MotionSegment, InvalidSegment> {
        if request.target.iter().any(|v| !v.is_finite()) {
            return Err(InvalidSegment::NonFiniteTarget);
        }
        let feed = request.feed_rate.value();
        if !(feed > 0.0) || !feed.is_finite() {
            return Err(InvalidSegment::InvalidFeedRate);
        }

        let steps_per_mm = self.config.steps_per_mm();
        let mut target = [0i32; N_AXIS];
        let mut steps = [0u32; N_AXIS];
        let mut direction_bits = AxisMask::NONE;
        let mut delta_mm = [0.0f32; N_AXIS];

        for i in 0..N_AXIS {
            target[i] = Steps::from_mm(Millimeters(request.target[i]), steps_per_mm[i]).0;
            let delta = target[i]
                .checked_sub(self.position[i])
                .ok_or(InvalidSegment::OutOfRange)?;
            steps[i] = delta.unsigned_abs();
            if delta < 0 {
                direction_bits.set(i);
            }
            delta_mm[i] = delta as f32 / steps_per_mm[i];
        }

        let step_event_count = steps.iter().copied().max().unwrap_or(0);
        if step_event_count == 0 {
            return Err(InvalidSegment::ZeroLength);
        }

        let millimeters = sqrtf(delta_mm.iter().map(|d| d * d).sum());
        let inverse_millimeters = 1.0 / millimeters;

        let inverse_minute = match request.feed_rate {
            FeedRate::UnitsPerMinute(rate) => rate.0 * inverse_millimeters,
            FeedRate::InverseTime(rate) => rate,
        };

        let stepper = &self.config.stepper;
        let rate_delta = ceilf(
            step_event_count as f32 * inverse_millimeters * self.config.motion.acceleration.0
                / (60.0 * stepper.acceleration_ticks_per_second as f32),
        ) as u32;

        Ok(MotionSegment {
            steps,
            direction_bits,
            step_event_count,
            target,
            millimeters,
            nominal_speed: millimeters * inverse_minute,
            nominal_rate: ceilf(step_event_count as f32 * inverse_minute) as u32,
            entry_speed: 0.0,
            max_entry_speed: 0.0,
            rate_delta: rate_delta.max(1),
            is_nominal_length: false,
        })
    }

    fn unit_vector(&self, segment: &MotionSegment) -> [f32; N_AXIS] {
        let steps_per_mm = self.config.steps_per_mm();
        let mut unit = [0.0f32; N_AXIS];
        for (i, value) in unit.iter_mut().enumerate() {
            let delta = (segment.target[i] - self.position[i]) as f32 / steps_per_mm[i];
            *value = delta / segment.millimeters;
        }
        unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{MmPerMin, MmPerMinSquared};
    use proptest::prelude::*;

    fn config() -> MachineConfig {
        let mut config = MachineConfig::default();
        config.axes.x.steps_per_mm = 100.0;
        config.axes.y.steps_per_mm = 100.0;
        config.axes.z.steps_per_mm = 100.0;
        config.motion.acceleration = MmPerMinSquared(119_294.0);
        config.motion.junction_deviation = Millimeters(0.05);
        config
    }

    fn line(x: f32, y: f32, feed: f32) -> LineRequest {
        LineRequest::new([x, y, 0.0], MmPerMin(feed))
    }

    #[test]
    fn test_segment_geometry() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(3.0, -4.0, 500.0)).unwrap();

        let segment = planner.segments().next().copied().unwrap();
        assert_eq!(segment.steps, [300, 400, 0]);
        assert_eq!(segment.step_event_count, 400);
        assert_eq!(segment.direction_bits, AxisMask::new(0b010));
        assert!((segment.millimeters - 5.0).abs() < 1e-4);
        assert!((segment.nominal_speed - 500.0).abs() < 1e-2);
        assert_eq!(segment.nominal_rate, 40_000);
        assert_eq!(planner.position(), [300, -400, 0]);
    }

    #[test]
    fn test_inverse_time_feed() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        // 10 mm in half a minute
        planner
            .enqueue(&LineRequest::inverse_time([10.0, 0.0, 0.0], 2.0))
            .unwrap();

        let segment = planner.segments().next().copied().unwrap();
        assert!((segment.nominal_speed - 20.0).abs() < 1e-3);
        assert_eq!(segment.nominal_rate, 2_000);
    }

    #[test]
    fn test_default_feed_and_seek_rates() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner
            .enqueue(&LineRequest::at_default_feed([10.0, 0.0, 0.0], &config.motion))
            .unwrap();
        planner
            .enqueue(&LineRequest::seek([20.0, 0.0, 0.0], &config.motion))
            .unwrap();

        let speeds: Vec<f32> = planner.segments().map(|s| s.nominal_speed).collect();
        assert!((speeds[0] - config.motion.default_feed_rate.0).abs() < 1e-2);
        assert!((speeds[1] - config.motion.default_seek_rate.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_invalid_segments() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);

        assert_eq!(
            planner.enqueue(&line(0.001, 0.0, 500.0)),
            Err(PlannerError::InvalidSegment(InvalidSegment::ZeroLength))
        );
        assert_eq!(
            planner.enqueue(&line(f32::NAN, 0.0, 500.0)),
            Err(PlannerError::InvalidSegment(InvalidSegment::NonFiniteTarget))
        );
        assert_eq!(
            planner.enqueue(&line(1.0, 0.0, 0.0)),
            Err(PlannerError::InvalidSegment(InvalidSegment::InvalidFeedRate))
        );
        assert!(planner.is_empty());
        assert_eq!(planner.position(), [0, 0, 0]);
    }

    #[test]
    fn test_queue_full_is_reported() {
        let config = config();
        let mut planner: Planner<'_, 2> = Planner::new(&config);
        planner.enqueue(&line(1.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(2.0, 0.0, 500.0)).unwrap();

        assert_eq!(
            planner.enqueue(&line(3.0, 0.0, 500.0)),
            Err(PlannerError::QueueFull)
        );
        // Rejected move did not advance the planned position
        assert_eq!(planner.position(), [200, 0, 0]);
    }

    #[test]
    fn test_right_angle_junction_speed() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(10.0, 10.0, 500.0)).unwrap();

        let speeds: Vec<(f32, f32)> = planner
            .segments()
            .map(|s| (s.entry_speed, s.max_entry_speed))
            .collect();
        assert_eq!(speeds[0], (0.0, 0.0));
        assert!((speeds[1].0 - 120.0).abs() < 0.1);
        assert!((speeds[1].1 - 120.0).abs() < 0.1);
    }

    #[test]
    fn test_reversal_stops() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(0.0, 0.0, 500.0)).unwrap();

        let entry = planner.segments().nth(1).map(|s| s.entry_speed).unwrap();
        assert_eq!(entry, 0.0);
    }

    #[test]
    fn test_short_segments_plan_both_directions() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        // Collinear moves too short to reach the requested feed
        for i in 1..=4 {
            planner.enqueue(&line(i as f32 * 0.1, 0.0, 5_000.0)).unwrap();
        }

        let entries: Vec<f32> = planner.segments().map(|s| s.entry_speed).collect();
        let one_segment = max_allowable_speed(-119_294.0, 0.0, 0.1);
        let two_segments = max_allowable_speed(-119_294.0, 0.0, 0.2);

        assert_eq!(entries[0], 0.0);
        // Limited by acceleration from rest
        assert!((entries[1] - one_segment).abs() < 0.5);
        assert!((entries[2] - two_segments).abs() < 0.5);
        // Limited by the stop at the end of the buffer
        assert!((entries[3] - one_segment).abs() < 0.5);
    }

    #[test]
    fn test_exit_speed_follows_front_until_committed() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(10.0, 10.0, 500.0)).unwrap();

        let first = planner.dequeue_for_execution().unwrap();
        assert_eq!(first.target, [1_000, 0, 0]);
        assert!(planner.has_segment_in_flight());
        assert!((planner.exit_speed() - 120.0).abs() < 0.1);

        let committed = planner.commit_exit_speed(f32::INFINITY);
        assert_eq!(committed, planner.exit_speed());

        // More look-ahead must not move the committed junction
        planner.enqueue(&line(20.0, 10.0, 500.0)).unwrap();
        planner.enqueue(&line(30.0, 10.0, 500.0)).unwrap();
        let front = planner.segments().next().map(|s| s.entry_speed).unwrap();
        assert_eq!(front, committed);

        for _ in 0..3 {
            planner.finish_execution();
            planner.dequeue_for_execution().unwrap();
        }
        assert_eq!(planner.exit_speed(), 0.0);
        assert_eq!(
            planner.dequeue_for_execution(),
            Err(PlannerError::QueueEmpty)
        );
    }

    #[test]
    fn test_junction_with_segment_in_flight() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.dequeue_for_execution().unwrap();
        assert_eq!(planner.exit_speed(), 0.0);

        // Corner with the running segment, not a stop
        planner.enqueue(&line(10.0, 10.0, 500.0)).unwrap();
        let front = planner.segments().next().copied().unwrap();
        assert!((front.max_entry_speed - 120.0).abs() < 0.1);
        assert!((planner.exit_speed() - 120.0).abs() < 0.1);
    }

    #[test]
    fn test_commit_lowers_front_to_reachable() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(20.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(30.0, 0.0, 500.0)).unwrap();
        planner.dequeue_for_execution().unwrap();
        assert!(planner.exit_speed() > 100.0);

        assert_eq!(planner.commit_exit_speed(60.0), 60.0);
        assert_eq!(planner.exit_speed(), 60.0);
        // Never raised again, only lowered
        planner.enqueue(&line(40.0, 0.0, 500.0)).unwrap();
        assert_eq!(planner.exit_speed(), 60.0);
        assert_eq!(planner.commit_exit_speed(30.0), 30.0);
        assert_eq!(planner.commit_exit_speed(90.0), 30.0);
    }

    #[test]
    fn test_committed_stop_limits_late_segment() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.dequeue_for_execution().unwrap();

        // Already decelerating to a stop when the next move arrives
        assert_eq!(planner.commit_exit_speed(f32::INFINITY), 0.0);
        planner.enqueue(&line(20.0, 0.0, 500.0)).unwrap();
        let front = planner.segments().next().copied().unwrap();
        assert_eq!(front.entry_speed, 0.0);
    }

    #[test]
    fn test_no_junction_after_finish() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.dequeue_for_execution().unwrap();
        planner.finish_execution();
        assert!(!planner.has_segment_in_flight());

        planner.enqueue(&line(20.0, 0.0, 500.0)).unwrap();
        let front = planner.segments().next().copied().unwrap();
        assert_eq!(front.max_entry_speed, 0.0);
    }

    #[test]
    fn test_rejects_target_out_of_step_range() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.set_position([-2_000_000_000, 0, 0]);

        assert_eq!(
            planner.enqueue(&line(2.0e7, 0.0, 500.0)),
            Err(PlannerError::InvalidSegment(InvalidSegment::OutOfRange))
        );
        assert!(planner.is_empty());
    }

    #[test]
    fn test_reset_clears_queue() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        planner.enqueue(&line(10.0, 0.0, 500.0)).unwrap();
        planner.enqueue(&line(10.0, 10.0, 500.0)).unwrap();

        planner.reset();
        assert!(planner.is_empty());

        // No junction with the discarded segments
        planner.enqueue(&line(10.0, 20.0, 500.0)).unwrap();
        let segment = planner.segments().next().copied().unwrap();
        assert_eq!(segment.max_entry_speed, 0.0);
    }

    proptest! {
        #[test]
        fn prop_entry_speed_within_limits(
            moves in prop::collection::vec((-20.0f32..20.0, -20.0f32..20.0, 10.0f32..2_000.0), 1..30)
        ) {
            let config = config();
            let mut planner: Planner<'_, 8> = Planner::new(&config);

            for (x, y, feed) in moves {
                if planner.is_full() {
                    planner.dequeue_for_execution().unwrap();
                }
                let _ = planner.enqueue(&line(x, y, feed));

                let segments: Vec<MotionSegment> = planner.segments().copied().collect();
                for (i, segment) in segments.iter().enumerate() {
                    prop_assert!(segment.entry_speed <= segment.max_entry_speed + 1e-3);
                    prop_assert!(segment.max_entry_speed <= segment.nominal_speed + 1e-3);
                    prop_assert!(segment.entry_speed >= 0.0);
                    if let Some(next) = segments.get(i + 1) {
                        // Every segment can reach its successor's entry speed
                        let reachable = max_allowable_speed(
                            -config.motion.acceleration.0,
                            segment.entry_speed,
                            segment.millimeters,
                        );
                        prop_assert!(next.entry_speed <= reachable * 1.001 + 1e-2);
                    }
                }
            }
        }
    }
}
