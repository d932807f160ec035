//! Homing cycle state machine.

use crate::config::units::Millimeters;
use crate::config::{AxisMask, MachineConfig};
use crate::error::{HomingError, Result};
use crate::planner::{LineRequest, Planner};
use crate::stepper::{SchedulerState, StepperScheduler};

/// Position of the homing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingState {
    /// Not homing.
    Idle,
    /// Searching for the switches at the seek rate.
    Seeking,
    /// Moving off the tripped switches before a precision approach.
    BackingOff,
    /// Approaching the switches at the homing feed rate.
    Approaching,
    /// Final retraction; its end becomes the axis origin.
    PullingOff,
    /// Homed axes are at zero.
    Homed,
    /// Sequence stopped with an error.
    Failed(HomingError),
}

/// Sequences the homing moves through the planner and scheduler.
///
/// Motion goes through ordinary segments. A switch trip issues a feed hold;
/// once the scheduler has stopped, the remaining motion is discarded and the
/// planner is resynchronised with the position actually reached.
#[derive(Debug, Clone)]
pub struct HomingCycle<'a> {
    config: &'a MachineConfig,
    state: HomingState,
    /// Precision approaches completed.
    approaches: u8,
    /// Axes still looking for their switch in the current move.
    pending: AxisMask,
    /// A trip was seen and the scheduler is decelerating.
    stopping: bool,
}

impl<'a> HomingCycle<'a> {
    /// Create an idle homing sequence.
    pub fn new(config: &'a MachineConfig) -> Self {
        Self {
            config,
            state: HomingState::Idle,
            approaches: 0,
            pending: AxisMask::NONE,
            stopping: false,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> HomingState {
        self.state
    }

    /// Check if a homing sequence is in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            HomingState::Seeking
                | HomingState::BackingOff
                | HomingState::Approaching
                | HomingState::PullingOff
        )
    }

    /// Start homing the configured axes.
    ///
    /// # Errors
    ///
    /// - `HomingError::Disabled` if homing is not enabled.
    /// - `HomingError::Busy` if motion is queued or in progress.
    pub fn start<const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> Result<()> {
        let homing = &self.config.homing;
        if !homing.enabled {
            return Err(HomingError::Disabled.into());
        }
        if !scheduler.is_idle() || !planner.is_empty() || self.is_active() {
            return Err(HomingError::Busy.into());
        }

        #[cfg(feature = "defmt")]
        defmt::info!("homing: start, axes {=u8:#b}", homing.axes.bits());

        planner.reset();
        self.approaches = 0;
        self.stopping = false;
        self.state = HomingState::Seeking;
        self.pending = homing.axes;
        self.issue_move(planner, scheduler, homing.axes, true, homing.max_travel)
    }

    /// Drop the sequence without touching motion; used on reset.
    pub fn abort(&mut self) {
        if self.is_active() {
            #[cfg(feature = "defmt")]
            defmt::warn!("homing: aborted");
        }
        self.state = HomingState::Idle;
        self.pending = AxisMask::NONE;
        self.stopping = false;
    }

    /// Advance the sequence with the debounced switch state.
    ///
    /// Call regularly from the foreground while [`HomingCycle::is_active`].
    ///
    /// # Errors
    ///
    /// - `HomingFailed` if a move completes without its switches tripping.
    /// - `SwitchNotReleased` if a back-off leaves a switch tripped.
    ///
    /// Either error stops motion and leaves the sequence in `Failed`.
    pub fn update<const N: usize>(
        &mut self,
        switches: AxisMask,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> Result<HomingState> {
        match self.state {
            HomingState::Seeking | HomingState::Approaching => {
                self.update_locate(switches, planner, scheduler)?;
            }
            HomingState::BackingOff => {
                if Self::move_done(planner, scheduler) {
                    let stuck = switches & self.config.homing.axes;
                    if !stuck.is_empty() {
                        return Err(self.fail(
                            HomingError::SwitchNotReleased { axes: stuck },
                            planner,
                            scheduler,
                        ));
                    }
                    self.begin_approach(planner, scheduler)?;
                }
            }
            HomingState::PullingOff => {
                if Self::move_done(planner, scheduler) {
                    self.finish(planner, scheduler);
                }
            }
            HomingState::Idle | HomingState::Homed | HomingState::Failed(_) => {}
        }
        Ok(self.state)
    }

    fn update_locate<const N: usize>(
        &mut self,
        switches: AxisMask,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> Result<()> {
        let tripped = switches & self.pending;
        if !tripped.is_empty() {
            self.pending = self.pending & !tripped;
            if !self.stopping {
                scheduler.feed_hold();
                self.stopping = true;
            }
        }

        if self.stopping {
            if matches!(scheduler.state(), SchedulerState::Held | SchedulerState::Idle) {
                Self::discard_motion(planner, scheduler);
                self.stopping = false;
                if self.pending.is_empty() {
                    self.locate_complete(planner, scheduler)?;
                } else {
                    // Keep searching with the axes that have not tripped yet
                    let (distance, _) = self.locate_move();
                    self.issue_move(planner, scheduler, self.pending, true, distance)?;
                }
            }
            return Ok(());
        }

        if Self::move_done(planner, scheduler) {
            let axes = self.pending;
            return Err(self.fail(HomingError::HomingFailed { axes }, planner, scheduler));
        }
        Ok(())
    }

    fn locate_complete<const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> Result<()> {
        let homing = &self.config.homing;
        if self.state == HomingState::Approaching {
            self.approaches += 1;
        }

        if self.state == HomingState::Seeking || self.approaches < homing.cycles {
            self.transition(HomingState::BackingOff);
            self.issue_move(planner, scheduler, homing.axes, false, homing.locate_backoff)
        } else if homing.pulloff.0 > 0.0 {
            self.transition(HomingState::PullingOff);
            self.issue_move(planner, scheduler, homing.axes, false, homing.pulloff)
        } else {
            self.finish(planner, scheduler);
            Ok(())
        }
    }

    fn begin_approach<const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> Result<()> {
        let homing = &self.config.homing;
        self.transition(HomingState::Approaching);
        self.pending = homing.axes;
        self.issue_move(planner, scheduler, homing.axes, true, homing.approach_travel())
    }

    fn finish<const N: usize>(
        &mut self,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) {
        scheduler.set_axes_position(self.config.homing.axes, 0);
        planner.reset();
        planner.set_position(scheduler.position());
        self.transition(HomingState::Homed);
    }

    fn fail<const N: usize>(
        &mut self,
        error: HomingError,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) -> crate::error::Error {
        #[cfg(feature = "defmt")]
        defmt::warn!("homing: failed: {}", error);
        Self::discard_motion(planner, scheduler);
        self.state = HomingState::Failed(error);
        self.stopping = false;
        error.into()
    }

    /// Travel bound and rate of the current search move.
    fn locate_move(&self) -> (Millimeters, crate::config::MmPerMin) {
        let homing = &self.config.homing;
        if self.state == HomingState::Seeking {
            (homing.max_travel, homing.seek_rate)
        } else {
            (homing.approach_travel(), homing.feed_rate)
        }
    }

    /// Queue one move of `distance` on every axis in `axes`, toward the
    /// switches or away from them, and start it.
    fn issue_move<const N: usize>(
        &self,
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
        axes: AxisMask,
        toward: bool,
        distance: Millimeters,
    ) -> Result<()> {
        let homing = &self.config.homing;
        let rate = if toward {
            self.locate_move().1
        } else {
            homing.seek_rate
        };

        let mut target = planner.position_mm();
        for i in axes.indices() {
            let sign = if toward { 1.0 } else { -1.0 } * homing.seek_sign(i);
            target[i] += sign * distance.0;
        }

        planner.enqueue(&LineRequest::new(target, rate))?;
        scheduler.cycle_start();
        Ok(())
    }

    fn discard_motion<const N: usize>(
        planner: &mut Planner<'_, N>,
        scheduler: &mut StepperScheduler<'_>,
    ) {
        scheduler.abort();
        planner.reset();
        planner.set_position(scheduler.position());
    }

    fn move_done<const N: usize>(planner: &Planner<'_, N>, scheduler: &StepperScheduler<'_>) -> bool {
        scheduler.is_idle() && planner.is_empty()
    }

    fn transition(&mut self, state: HomingState) {
        #[cfg(feature = "defmt")]
        defmt::debug!("homing: {} -> {}", self.state, state);
        self.state = state;
    }
}
