//! Motion system facade.
//!
//! Wires the planner, the scheduler, the homing cycle and the runtime flags
//! around one [`StepperPort`].

use crate::config::{AxisMask, MachineConfig, N_AXIS};
use crate::config::units::Steps;
use crate::error::{Error, Result, StepperError};
use crate::homing::{HomingCycle, HomingState, LimitDebouncer, LimitSwitches};
use crate::planner::{LineRequest, Planner, SEGMENT_QUEUE_CAPACITY};
use crate::realtime::{RuntimeFlags, StatusReport};
use crate::stepper::{SchedulerState, StepEvent, StepperPort, StepperScheduler};

/// Externally visible machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MachineState {
    /// Nothing queued, nothing moving.
    Idle,
    /// Segments queued but no cycle started.
    Queued,
    /// Executing segments.
    Cycle,
    /// Decelerating into or stopped in a feed hold.
    Hold,
    /// Homing cycle running.
    Homing,
    /// Motion locked after a hard limit or a failed homing cycle.
    Alarm,
}

impl MachineState {
    /// Name used in status reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Queued => "Queue",
            Self::Cycle => "Cycle",
            Self::Hold => "Hold",
            Self::Homing => "Home",
            Self::Alarm => "Alarm",
        }
    }
}

/// Complete motion subsystem.
///
/// [`MotionSystem::tick`] is the fixed-rate part and must run at
/// `stepper.tick_frequency_hz`. Everything else belongs to the foreground
/// loop. On a target where the tick runs in an interrupt, the system lives
/// behind a critical-section mutex; foreground calls are short and bounded.
pub struct MotionSystem<'a, P: StepperPort, const N: usize = SEGMENT_QUEUE_CAPACITY> {
    config: &'a MachineConfig,
    planner: Planner<'a, N>,
    scheduler: StepperScheduler<'a>,
    homing: HomingCycle<'a>,
    debouncer: LimitDebouncer,
    flags: &'a RuntimeFlags,
    port: P,
    alarm: bool,
    auto_start: bool,
}

impl<'a, P: StepperPort, const N: usize> MotionSystem<'a, P, N> {
    /// Create an idle system at the machine origin.
    pub fn new(config: &'a MachineConfig, flags: &'a RuntimeFlags, port: P) -> Self {
        Self {
            config,
            planner: Planner::new(config),
            scheduler: StepperScheduler::new(config),
            homing: HomingCycle::new(config),
            debouncer: LimitDebouncer::new(config.homing.debounce_ms as u32),
            flags,
            port,
            alarm: false,
            auto_start: config.stepper.auto_start,
        }
    }

    /// Current machine state.
    pub fn state(&self) -> MachineState {
        if self.alarm {
            return MachineState::Alarm;
        }
        if self.homing.is_active() {
            return MachineState::Homing;
        }
        match self.scheduler.state() {
            SchedulerState::Holding | SchedulerState::Held => MachineState::Hold,
            SchedulerState::Running => MachineState::Cycle,
            SchedulerState::Idle if self.planner.is_empty() => MachineState::Idle,
            SchedulerState::Idle => MachineState::Queued,
        }
    }

    /// Check if motion is locked by an alarm.
    #[inline]
    pub fn is_alarmed(&self) -> bool {
        self.alarm
    }

    /// Machine position in steps, as emitted.
    #[inline]
    pub fn position(&self) -> [i32; N_AXIS] {
        self.scheduler.position()
    }

    /// Machine position in mm.
    pub fn position_mm(&self) -> [f32; N_AXIS] {
        let steps_per_mm = self.config.steps_per_mm();
        let position = self.scheduler.position();
        let mut mm = [0.0; N_AXIS];
        for (i, value) in mm.iter_mut().enumerate() {
            *value = Steps(position[i]).to_mm(steps_per_mm[i]).0;
        }
        mm
    }

    /// The planner.
    #[inline]
    pub fn planner(&self) -> &Planner<'a, N> {
        &self.planner
    }

    /// The scheduler.
    #[inline]
    pub fn scheduler(&self) -> &StepperScheduler<'a> {
        &self.scheduler
    }

    /// Homing sequence state.
    #[inline]
    pub fn homing_state(&self) -> HomingState {
        self.homing.state()
    }

    /// The stepper port.
    #[inline]
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Queue a linear move.
    ///
    /// With auto start enabled an idle scheduler starts the cycle at once.
    ///
    /// # Errors
    ///
    /// - `Error::Locked` while alarmed or homing.
    /// - `PlannerError::QueueFull` when the queue is at capacity; retry after
    ///   the scheduler has consumed a segment.
    /// - `PlannerError::InvalidSegment` for a degenerate move.
    pub fn buffer_line(&mut self, request: &LineRequest) -> Result<()> {
        if self.alarm || self.homing.is_active() {
            return Err(Error::Locked);
        }
        self.planner.enqueue(request)?;
        if self.auto_start && self.scheduler.is_idle() {
            self.scheduler.cycle_start();
        }
        Ok(())
    }

    /// Run one scheduler tick.
    ///
    /// A pending reset or alarm stops pulse output immediately; the rest of
    /// the cleanup happens in [`MotionSystem::execute_runtime`].
    ///
    /// # Errors
    ///
    /// Returns `StepperError::Port` if an output write fails.
    pub fn tick(&mut self) -> Result<Option<StepEvent>> {
        if self.flags.is_set(RuntimeFlags::RESET | RuntimeFlags::ALARM) {
            self.scheduler.abort();
            return Ok(None);
        }

        let was_running = !self.scheduler.is_idle();
        let event = self.scheduler.tick(&mut self.planner, &mut self.port)?;
        if was_running && self.scheduler.is_idle() {
            self.flags.set(RuntimeFlags::CYCLE_STOP);
        }
        Ok(event)
    }

    /// Consume pending runtime flags.
    ///
    /// Reset takes precedence and discards every other pending flag. Returns
    /// a report when one was requested.
    pub fn execute_runtime(&mut self) -> Option<StatusReport> {
        let pending = self.flags.take();
        if pending == 0 {
            return None;
        }

        if pending & RuntimeFlags::RESET != 0 {
            self.reset();
            return None;
        }

        if pending & RuntimeFlags::ALARM != 0 && !self.alarm {
            self.raise_alarm();
        }

        // Homing drives its own holds; a held homing move could not resume
        if pending & RuntimeFlags::FEED_HOLD != 0 && !self.homing.is_active() {
            self.scheduler.feed_hold();
            self.auto_start = false;
        }

        if pending & RuntimeFlags::CYCLE_START != 0 && !self.alarm && !self.homing.is_active() {
            self.scheduler.cycle_start();
            self.auto_start = self.config.stepper.auto_start;
        }

        if pending & RuntimeFlags::STATUS_REPORT != 0 {
            Some(self.status_report())
        } else {
            None
        }
    }

    /// Snapshot for the status report command.
    pub fn status_report(&self) -> StatusReport {
        StatusReport::new(self.state(), self.position_mm(), &self.config.report)
    }

    /// Start a homing cycle. Clears the alarm once it succeeds.
    ///
    /// # Errors
    ///
    /// - `HomingError::Disabled` if homing is not enabled.
    /// - `HomingError::Busy` if motion is queued or running.
    pub fn home(&mut self) -> Result<()> {
        self.homing.start(&mut self.planner, &mut self.scheduler)
    }

    /// Feed a raw limit switch reading taken at `now_ms`.
    ///
    /// Drives the homing cycle when one is active; otherwise a debounced trip
    /// with hard limits enabled aborts all motion and raises the alarm.
    /// Returns the debounced switch state.
    ///
    /// # Errors
    ///
    /// Homing errors; the machine is alarmed when one is returned.
    pub fn update_limits(&mut self, now_ms: u32, raw: AxisMask) -> Result<AxisMask> {
        let switches = self.debouncer.update(now_ms, raw);

        if self.homing.is_active() {
            match self.homing.update(switches, &mut self.planner, &mut self.scheduler) {
                Ok(HomingState::Homed) => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("system: homed");
                    self.alarm = false;
                }
                Ok(_) => {}
                Err(e) => {
                    self.alarm = true;
                    return Err(e);
                }
            }
        } else if self.config.homing.hard_limits && !switches.is_empty() && !self.alarm {
            #[cfg(feature = "defmt")]
            defmt::warn!("system: hard limit {=u8:#b}", switches.bits());
            self.flags.set(RuntimeFlags::ALARM);
            self.raise_alarm();
        }
        Ok(switches)
    }

    /// Read the limit inputs and feed them to [`MotionSystem::update_limits`].
    ///
    /// # Errors
    ///
    /// `StepperError::LimitInput` if the inputs cannot be read, or a homing
    /// error.
    pub fn poll_limits<L: LimitSwitches>(&mut self, now_ms: u32, switches: &mut L) -> Result<AxisMask> {
        let raw = switches.read().map_err(|_| StepperError::LimitInput)?;
        self.update_limits(now_ms, raw)
    }

    /// Discard all motion and return to idle, keeping the position reached.
    ///
    /// Switch history is dropped too: a switch still tripped must be stable
    /// for a full debounce window before it counts again.
    pub fn reset(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("system: reset");
        self.flags.clear(RuntimeFlags::RESET | RuntimeFlags::ALARM);
        self.homing.abort();
        self.debouncer.reset();
        self.discard_motion();
        self.alarm = false;
        self.auto_start = self.config.stepper.auto_start;
    }

    /// Release the stepper port.
    pub fn release(self) -> P {
        self.port
    }

    fn raise_alarm(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::warn!("system: alarm");
        self.homing.abort();
        self.discard_motion();
        self.alarm = true;
    }

    fn discard_motion(&mut self) {
        self.scheduler.abort();
        self.planner.reset();
        self.planner.set_position(self.scheduler.position());
    }
}
