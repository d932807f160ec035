//! Fixed-rate stepper pulse scheduler.

use crate::config::{AxisMask, MachineConfig, N_AXIS};
use crate::error::StepperError;
use crate::motion::{
    max_allowable_speed, rate_for_speed, MotionPhase, TrapezoidGenerator, VelocityProfile,
};
use crate::planner::{MotionSegment, Planner};

use super::axis::AxisPulseState;
use super::port::StepperPort;

/// Execution state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerState {
    /// No segment in flight; outputs hold.
    Idle,
    /// Executing segments.
    Running,
    /// Decelerating toward a feed hold.
    Holding,
    /// Stopped mid-segment, waiting for cycle start.
    Held,
}

/// One step event emitted by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepEvent {
    /// Axes that received a step pulse.
    pub steps: AxisMask,
    /// Axes moving in the negative direction.
    pub directions: AxisMask,
    /// Step rate in effect, step events per minute.
    pub rate: u32,
}

/// Segment owned by the scheduler for its execution lifetime.
#[derive(Debug, Clone, Copy)]
struct ActiveSegment {
    segment: MotionSegment,
    /// Speed the current profile ends at.
    exit_speed: f32,
    /// Planner exit speed the current profile was built from.
    planned_exit: f32,
    /// Exit speed is fixed in the planner; set once deceleration starts.
    exit_committed: bool,
    step_events_completed: u32,
    /// Step events already done when the current profile started.
    profile_offset: u32,
}

/// Drives the step outputs from the planner's queue.
///
/// [`StepperScheduler::tick`] must be called at `stepper.tick_frequency_hz`.
/// Each call does a bounded amount of work and never waits: it adds the
/// current step rate to an accumulator, fires a step event on overflow,
/// distributes the event over the axes with Bresenham's algorithm and updates
/// the rate on acceleration ticks.
///
/// The exit speed of the segment in flight is read from the planner on every
/// tick until its deceleration starts, so a segment queued behind a running
/// one still gets a cornering speed.
#[derive(Debug, Clone)]
pub struct StepperScheduler<'a> {
    config: &'a MachineConfig,
    state: SchedulerState,
    active: Option<ActiveSegment>,
    axes: [AxisPulseState; N_AXIS],
    generator: TrapezoidGenerator,
    rate_counter: u32,
    /// Cycle start received while still decelerating into a hold.
    resume_pending: bool,
    /// Profile must be rebuilt against the planner on the next tick.
    replan_pending: bool,
    idle_ticks: u32,
    drivers_enabled: bool,
}

impl<'a> StepperScheduler<'a> {
    /// Create an idle scheduler at the machine origin.
    pub fn new(config: &'a MachineConfig) -> Self {
        let stepper = &config.stepper;
        Self {
            config,
            state: SchedulerState::Idle,
            active: None,
            axes: [AxisPulseState::at(0); N_AXIS],
            generator: TrapezoidGenerator::new(
                stepper.ticks_per_acceleration_tick(),
                stepper.minimum_steps_per_minute,
                stepper.ticks_per_minute(),
            ),
            rate_counter: 0,
            resume_pending: false,
            replan_pending: false,
            idle_ticks: 0,
            drivers_enabled: false,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Check if no motion is in progress or held.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == SchedulerState::Idle
    }

    /// Machine position in steps, as actually emitted.
    pub fn position(&self) -> [i32; N_AXIS] {
        self.axes.map(|axis| axis.position())
    }

    /// Overwrite the machine position.
    pub fn set_position(&mut self, position: [i32; N_AXIS]) {
        for (axis, value) in self.axes.iter_mut().zip(position) {
            axis.set_position(value);
        }
    }

    /// Overwrite the position of the axes in `mask`.
    pub fn set_axes_position(&mut self, mask: AxisMask, value: i32) {
        for i in mask.indices() {
            self.axes[i].set_position(value);
        }
    }

    /// Step rate in effect, 0 when not moving.
    pub fn current_rate(&self) -> u32 {
        match (self.state, self.active.is_some()) {
            (SchedulerState::Running | SchedulerState::Holding, true) => self.generator.rate(),
            _ => 0,
        }
    }

    /// Trapezoid phase of the segment in flight.
    pub fn phase(&self) -> MotionPhase {
        if self.active.is_some() {
            self.generator.phase()
        } else {
            MotionPhase::Complete
        }
    }

    /// Segment in flight.
    pub fn active_segment(&self) -> Option<&MotionSegment> {
        self.active.as_ref().map(|active| &active.segment)
    }

    /// Profile currently tracked.
    pub fn profile(&self) -> Option<&VelocityProfile> {
        self.active.as_ref().map(|_| self.generator.profile())
    }

    /// Step events left in the segment in flight.
    pub fn step_events_remaining(&self) -> u32 {
        self.active
            .as_ref()
            .map(|a| a.segment.step_event_count - a.step_events_completed)
            .unwrap_or(0)
    }

    /// Check if drivers are currently enabled.
    #[inline]
    pub fn drivers_enabled(&self) -> bool {
        self.drivers_enabled
    }

    /// Start a cycle when idle, or resume a hold.
    ///
    /// A cycle start received while a hold is still decelerating is applied
    /// once the hold completes.
    pub fn cycle_start(&mut self) {
        match self.state {
            SchedulerState::Idle => {
                #[cfg(feature = "defmt")]
                defmt::info!("scheduler: cycle start");
                self.state = SchedulerState::Running;
                self.rate_counter = 0;
            }
            SchedulerState::Holding => self.resume_pending = true,
            SchedulerState::Held => self.resume(),
            SchedulerState::Running => {}
        }
    }

    /// Decelerate to a stop without discarding any segment.
    pub fn feed_hold(&mut self) {
        if self.state == SchedulerState::Running {
            #[cfg(feature = "defmt")]
            defmt::info!("scheduler: feed hold");
            self.state = SchedulerState::Holding;
            self.resume_pending = false;
        }
    }

    /// Stop immediately and drop the segment in flight.
    ///
    /// The position keeps every step already emitted.
    pub fn abort(&mut self) {
        if self.state != SchedulerState::Idle {
            #[cfg(feature = "defmt")]
            defmt::warn!("scheduler: abort");
        }
        self.active = None;
        self.state = SchedulerState::Idle;
        self.resume_pending = false;
        self.replan_pending = false;
        self.rate_counter = 0;
        self.idle_ticks = 0;
    }

    /// Run one scheduler tick.
    ///
    /// Returns the step event fired in this tick, if any.
    ///
    /// # Errors
    ///
    /// Returns `StepperError::Port` if an output write fails. The scheduler
    /// state is left consistent and the next tick may proceed.
    pub fn tick<P, const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        port: &mut P,
    ) -> Result<Option<StepEvent>, StepperError>
    where
        P: StepperPort,
    {
        match self.state {
            SchedulerState::Idle => {
                self.idle_tick(port)?;
                return Ok(None);
            }
            SchedulerState::Held => return Ok(None),
            SchedulerState::Running | SchedulerState::Holding => {}
        }

        if self.active.is_none() && !self.load_next(planner, port)? {
            return Ok(None);
        }

        let event = self.step_tick(planner, port)?;
        if self.active.is_some() {
            self.update_rate(planner);
        }
        Ok(event)
    }

    fn step_tick<P, const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        port: &mut P,
    ) -> Result<Option<StepEvent>, StepperError>
    where
        P: StepperPort,
    {
        let ticks_per_minute = self.config.stepper.ticks_per_minute();
        let rate = self.generator.rate();
        self.rate_counter += rate;
        if self.rate_counter < ticks_per_minute {
            return Ok(None);
        }
        self.rate_counter -= ticks_per_minute;

        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        let segment = active.segment;
        let exit_committed = active.exit_committed;

        let mut steps = AxisMask::NONE;
        for (i, axis) in self.axes.iter_mut().enumerate() {
            if axis.advance(
                segment.steps[i],
                segment.step_event_count,
                segment.direction_bits.is_set(i),
            ) {
                steps.set(i);
            }
        }
        active.step_events_completed += 1;
        let completed = active.step_events_completed >= segment.step_event_count;

        port.pulse_steps(steps).map_err(|_| StepperError::Port)?;

        let event = StepEvent {
            steps,
            directions: segment.direction_bits,
            rate,
        };

        if completed {
            // A hold may end the segment below its committed exit speed
            if !exit_committed || self.state == SchedulerState::Holding {
                planner.commit_exit_speed(speed_for_rate(&segment, rate as f32));
            }
            planner.finish_execution();
            self.active = None;
            if self.load_next(planner, port)? && self.state == SchedulerState::Holding {
                self.carry_over_hold(&segment, rate);
            }
        }
        Ok(Some(event))
    }

    fn update_rate<const N: usize>(&mut self, planner: &mut Planner<'_, N>) {
        match self.state {
            SchedulerState::Running => self.follow_profile(planner),
            SchedulerState::Holding => {
                if self.generator.hold_tick() {
                    self.enter_held();
                }
            }
            SchedulerState::Idle | SchedulerState::Held => {}
        }
    }

    /// Advance the profile, following the planner's exit speed until the
    /// deceleration starts.
    fn follow_profile<const N: usize>(&mut self, planner: &mut Planner<'_, N>) {
        let Some(active) = self.active else {
            return;
        };
        let rate = self.generator.rate();
        let planned = planner.exit_speed();
        if self.replan_pending {
            self.replan_pending = false;
            let exit_speed = self.restart_profile(rate, planned);
            if active.exit_committed {
                planner.commit_exit_speed(exit_speed);
            }
        } else if !active.exit_committed && planned != active.planned_exit {
            self.restart_profile(rate, planned);
        }

        let Some(active) = self.active.as_mut() else {
            return;
        };
        self.generator
            .tick(active.step_events_completed - active.profile_offset);
        if !active.exit_committed && self.generator.phase() == MotionPhase::Decelerating {
            active.exit_committed = true;
            let exit_speed = active.exit_speed;
            let committed = planner.commit_exit_speed(exit_speed);
            if committed < exit_speed {
                self.restart_profile(self.generator.rate(), committed);
            }
        }
    }

    /// Rebuild the profile over the rest of the segment in flight.
    ///
    /// Starts at `rate` and ends at `planned_exit`, or at the fastest speed
    /// reachable from `rate` if that is lower. Returns the exit speed used.
    fn restart_profile(&mut self, rate: u32, planned_exit: f32) -> f32 {
        let Some(mut active) = self.active else {
            return planned_exit;
        };
        let segment = active.segment;
        let remaining = segment.step_event_count - active.step_events_completed;
        let exit_speed = planned_exit.min(self.reachable_speed(&segment, rate, remaining));

        let floor = self.config.stepper.minimum_steps_per_minute;
        let profile = self.profile_for(&segment, rate.max(floor), exit_speed, remaining);
        self.generator.start_at(profile, rate);

        active.exit_speed = exit_speed;
        active.planned_exit = planned_exit;
        active.profile_offset = active.step_events_completed;
        self.active = Some(active);
        exit_speed
    }

    /// Fastest speed reachable by accelerating from `rate` over `steps`.
    fn reachable_speed(&self, segment: &MotionSegment, rate: u32, steps: u32) -> f32 {
        let acceleration = segment.rate_delta as f32
            * self.config.stepper.acceleration_ticks_per_second as f32
            * 60.0;
        let reachable = max_allowable_speed(-acceleration, rate as f32, steps as f32);
        speed_for_rate(segment, reachable)
    }

    /// Take the next segment from the planner. Goes idle if there is none.
    fn load_next<P, const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        port: &mut P,
    ) -> Result<bool, StepperError>
    where
        P: StepperPort,
    {
        let Ok(segment) = planner.dequeue_for_execution() else {
            self.go_idle();
            return Ok(false);
        };

        if !self.drivers_enabled {
            port.set_enabled(true).map_err(|_| StepperError::Port)?;
            self.drivers_enabled = true;
        }
        let invert = self.config.stepper.direction_invert_mask;
        port.set_directions(segment.direction_bits ^ invert)
            .map_err(|_| StepperError::Port)?;

        for axis in self.axes.iter_mut() {
            axis.start_segment(segment.step_event_count);
        }

        let exit_speed = planner.exit_speed();
        let profile = self.profile_for(
            &segment,
            self.rate_for(&segment, segment.entry_speed),
            exit_speed,
            segment.step_event_count,
        );
        self.generator.start(profile);
        self.active = Some(ActiveSegment {
            segment,
            exit_speed,
            planned_exit: exit_speed,
            exit_committed: false,
            step_events_completed: 0,
            profile_offset: 0,
        });
        Ok(true)
    }

    /// Keep decelerating into the next segment from the speed reached.
    fn carry_over_hold(&mut self, previous: &MotionSegment, rate: u32) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let rate = self.rate_for(&active.segment, speed_for_rate(previous, rate as f32));
        let profile = *self.generator.profile();
        self.generator.start_at(profile, rate);
    }

    fn enter_held(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("scheduler: held");
        self.state = SchedulerState::Held;
        if self.resume_pending {
            self.resume();
        }
    }

    /// Restart the held segment from rest over its remaining step events.
    ///
    /// The exit speed is checked against the planner on the next tick.
    fn resume(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("scheduler: resume");
        self.resume_pending = false;
        self.state = SchedulerState::Running;

        if let Some(active) = self.active {
            self.restart_profile(self.config.stepper.minimum_steps_per_minute, active.planned_exit);
            self.replan_pending = true;
        }
    }

    fn go_idle(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("scheduler: cycle stop");
        self.active = None;
        self.state = SchedulerState::Idle;
        self.resume_pending = false;
        self.replan_pending = false;
        self.idle_ticks = 0;
    }

    fn idle_tick<P: StepperPort>(&mut self, port: &mut P) -> Result<(), StepperError> {
        if !self.drivers_enabled {
            return Ok(());
        }
        let Some(lock_ticks) = self.config.stepper.idle_lock_ticks() else {
            return Ok(());
        };
        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks >= lock_ticks {
            port.set_enabled(false).map_err(|_| StepperError::Port)?;
            self.drivers_enabled = false;
        }
        Ok(())
    }

    fn profile_for(
        &self,
        segment: &MotionSegment,
        initial_rate: u32,
        exit_speed: f32,
        step_event_count: u32,
    ) -> VelocityProfile {
        VelocityProfile::trapezoid(
            step_event_count,
            segment.nominal_rate,
            segment.rate_delta,
            initial_rate,
            self.rate_for(segment, exit_speed),
            self.config.stepper.acceleration_ticks_per_second,
        )
    }

    #[inline]
    fn rate_for(&self, segment: &MotionSegment, speed: f32) -> u32 {
        rate_for_speed(
            segment.nominal_rate,
            speed,
            segment.nominal_speed,
            self.config.stepper.minimum_steps_per_minute,
        )
    }
}

/// Speed along `segment` at a step rate.
fn speed_for_rate(segment: &MotionSegment, rate: f32) -> f32 {
    if segment.nominal_rate > 0 {
        rate / segment.nominal_rate as f32 * segment.nominal_speed
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::{MmPerMin, MmPerMinSquared};
    use crate::planner::LineRequest;

    /// Port that counts pulses and remembers the last outputs.
    #[derive(Default)]
    struct CountingPort {
        pulses: [u32; N_AXIS],
        directions: AxisMask,
        enabled: bool,
        enable_writes: u32,
    }

    impl StepperPort for CountingPort {
        type Error = ();

        fn set_directions(&mut self, directions: AxisMask) -> Result<(), ()> {
            self.directions = directions;
            Ok(())
        }

        fn pulse_steps(&mut self, steps: AxisMask) -> Result<(), ()> {
            for i in steps.indices() {
                self.pulses[i] += 1;
            }
            Ok(())
        }

        fn set_enabled(&mut self, enabled: bool) -> Result<(), ()> {
            self.enabled = enabled;
            self.enable_writes += 1;
            Ok(())
        }
    }

    fn config() -> MachineConfig {
        let mut config = MachineConfig::default();
        config.axes.x.steps_per_mm = 100.0;
        config.axes.y.steps_per_mm = 100.0;
        config.axes.z.steps_per_mm = 100.0;
        config.motion.acceleration = MmPerMinSquared(360_000.0);
        config
    }

    fn run_until_idle(
        scheduler: &mut StepperScheduler<'_>,
        planner: &mut Planner<'_>,
        port: &mut CountingPort,
    ) -> u32 {
        let mut ticks = 0;
        while !scheduler.is_idle() {
            scheduler.tick(planner, port).unwrap();
            ticks += 1;
            assert!(ticks < 10_000_000, "scheduler never went idle");
        }
        ticks
    }

    #[test]
    fn test_executes_exact_steps() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([1.0, -0.5, 0.25], MmPerMin(300.0)))
            .unwrap();
        scheduler.cycle_start();
        run_until_idle(&mut scheduler, &mut planner, &mut port);

        assert_eq!(port.pulses, [100, 50, 25]);
        assert_eq!(scheduler.position(), [100, -50, 25]);
        // Y moves negative; Y and Z directions are inverted by default
        assert_eq!(port.directions, AxisMask::new(0b010) ^ AxisMask::new(0b110));
    }

    #[test]
    fn test_rate_stays_within_bounds() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([5.0, 0.0, 0.0], MmPerMin(600.0)))
            .unwrap();
        let nominal_rate = planner.segments().next().map(|s| s.nominal_rate).unwrap();
        scheduler.cycle_start();

        while !scheduler.is_idle() {
            if let Some(event) = scheduler.tick(&mut planner, &mut port).unwrap() {
                assert!(event.rate >= config.stepper.minimum_steps_per_minute);
                assert!(event.rate <= nominal_rate);
            }
        }
        assert_eq!(port.pulses[0], 500);
    }

    #[test]
    fn test_segment_queued_while_running_gets_corner_speed() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([10.0, 0.0, 0.0], MmPerMin(500.0)))
            .unwrap();
        scheduler.cycle_start();
        scheduler.tick(&mut planner, &mut port).unwrap();
        assert!(planner.is_empty());

        planner
            .enqueue(&LineRequest::new([10.0, 10.0, 0.0], MmPerMin(500.0)))
            .unwrap();
        let next = planner.segments().next().copied().unwrap();
        assert!(next.entry_speed > 100.0);

        let floor = config.stepper.minimum_steps_per_minute;
        let corner_rate = rate_for_speed(next.nominal_rate, next.entry_speed, next.nominal_speed, floor);
        let mut last_x = 0;
        let mut first_y = None;
        while !scheduler.is_idle() {
            if let Some(event) = scheduler.tick(&mut planner, &mut port).unwrap() {
                if event.steps.is_set(0) {
                    last_x = event.rate;
                } else if first_y.is_none() {
                    first_y = Some(event.rate);
                }
            }
        }

        assert_eq!(port.pulses, [1_000, 1_000, 0]);
        assert_eq!(first_y, Some(corner_rate));
        assert!(last_x >= corner_rate);
    }

    #[test]
    fn test_segment_queued_during_final_deceleration_starts_from_rest() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([10.0, 0.0, 0.0], MmPerMin(500.0)))
            .unwrap();
        scheduler.cycle_start();
        while scheduler.phase() != MotionPhase::Decelerating {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }

        // Too late to keep moving through the junction
        planner
            .enqueue(&LineRequest::new([20.0, 0.0, 0.0], MmPerMin(500.0)))
            .unwrap();
        let next = planner.segments().next().copied().unwrap();
        assert_eq!(next.entry_speed, 0.0);

        run_until_idle(&mut scheduler, &mut planner, &mut port);
        assert_eq!(port.pulses[0], 2_000);
    }

    #[test]
    fn test_idle_without_segments() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        scheduler.cycle_start();
        assert_eq!(scheduler.tick(&mut planner, &mut port), Ok(None));
        assert!(scheduler.is_idle());
        // Drivers were never woken
        assert_eq!(port.enable_writes, 0);
    }

    #[test]
    fn test_idle_lock_disables_drivers() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([0.1, 0.0, 0.0], MmPerMin(300.0)))
            .unwrap();
        scheduler.cycle_start();
        run_until_idle(&mut scheduler, &mut planner, &mut port);
        assert!(port.enabled);

        let lock_ticks = config.stepper.idle_lock_ticks().unwrap();
        for _ in 0..lock_ticks - 1 {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }
        assert!(port.enabled);
        scheduler.tick(&mut planner, &mut port).unwrap();
        assert!(!port.enabled);
        assert!(!scheduler.drivers_enabled());
    }

    #[test]
    fn test_idle_lock_always_keeps_drivers() {
        let mut config = config();
        config.stepper.idle_lock_time_ms = crate::config::IDLE_LOCK_ALWAYS;
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([0.1, 0.0, 0.0], MmPerMin(300.0)))
            .unwrap();
        scheduler.cycle_start();
        run_until_idle(&mut scheduler, &mut planner, &mut port);
        for _ in 0..100_000 {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }
        assert!(port.enabled);
    }

    #[test]
    fn test_hold_and_resume() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([20.0, 0.0, 0.0], MmPerMin(600.0)))
            .unwrap();
        scheduler.cycle_start();
        while port.pulses[0] < 500 {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }

        scheduler.feed_hold();
        assert_eq!(scheduler.state(), SchedulerState::Holding);
        let mut ticks = 0;
        while scheduler.state() == SchedulerState::Holding {
            scheduler.tick(&mut planner, &mut port).unwrap();
            ticks += 1;
            assert!(ticks < 1_000_000);
        }
        assert_eq!(scheduler.state(), SchedulerState::Held);
        assert_eq!(scheduler.current_rate(), 0);

        // Nothing moves while held
        let held_at = port.pulses[0];
        for _ in 0..10_000 {
            assert_eq!(scheduler.tick(&mut planner, &mut port), Ok(None));
        }
        assert_eq!(port.pulses[0], held_at);
        assert!(held_at < 2_000);

        scheduler.cycle_start();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        // Resumed from rest
        assert_eq!(scheduler.current_rate(), config.stepper.minimum_steps_per_minute);
        run_until_idle(&mut scheduler, &mut planner, &mut port);
        assert_eq!(port.pulses[0], 2_000);
    }

    #[test]
    fn test_cycle_start_during_hold_is_deferred() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([20.0, 0.0, 0.0], MmPerMin(600.0)))
            .unwrap();
        scheduler.cycle_start();
        while port.pulses[0] < 500 {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }

        scheduler.feed_hold();
        scheduler.tick(&mut planner, &mut port).unwrap();
        scheduler.cycle_start();
        assert_eq!(scheduler.state(), SchedulerState::Holding);

        run_until_idle(&mut scheduler, &mut planner, &mut port);
        assert_eq!(port.pulses[0], 2_000);
    }

    #[test]
    fn test_abort_keeps_position() {
        let config = config();
        let mut planner: Planner<'_> = Planner::new(&config);
        let mut scheduler = StepperScheduler::new(&config);
        let mut port = CountingPort::default();

        planner
            .enqueue(&LineRequest::new([20.0, 0.0, 0.0], MmPerMin(600.0)))
            .unwrap();
        scheduler.cycle_start();
        while port.pulses[0] < 100 {
            scheduler.tick(&mut planner, &mut port).unwrap();
        }

        scheduler.abort();
        assert!(scheduler.is_idle());
        assert!(scheduler.active_segment().is_none());
        assert_eq!(scheduler.position(), [100, 0, 0]);
    }
}
