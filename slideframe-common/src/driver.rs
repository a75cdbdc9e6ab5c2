use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::error::{ErrorReporting, SlideframeError};
use crate::ipc::StatusReport;
use crate::render::Renderer;
use crate::schedule::{Clock, DisplayPowerScheduler, PowerStatus};
use crate::sequencer::{PlaylistSequencer, SequencerStatus};
use crate::Result;

/// Out-of-band requests, delivered between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RotateNow,
    ToggleScheduleMode,
}

#[derive(Debug, Clone, Copy)]
pub struct DriverSettings {
    pub cycle_interval: Duration,
    pub manage_power: bool,
}

/// Read side of the driver state. Answers status queries without going
/// through the trigger queue, so it stays responsive during the off-window.
#[derive(Debug, Clone)]
pub struct StatusFeed {
    sequencer: watch::Receiver<SequencerStatus>,
    power: watch::Receiver<PowerStatus>,
}

impl StatusFeed {
    pub fn snapshot(&self) -> StatusReport {
        let sequencer = self.sequencer.borrow().clone();
        let power = *self.power.borrow();
        status_report(sequencer, power)
    }
}

fn status_report(sequencer: SequencerStatus, power: PowerStatus) -> StatusReport {
    StatusReport {
        playlist: sequencer.playlist,
        current_image: sequencer.current_image,
        position: sequencer.position,
        total: sequencer.total,
        display_on: power.display_on,
        override_schedule: power.override_schedule,
    }
}

/// Runs the slideshow: one image per cycle interval, gated by the power
/// schedule, interleaved with triggers from the control socket.
pub struct CycleDriver {
    sequencer: PlaylistSequencer,
    scheduler: DisplayPowerScheduler,
    renderer: Box<dyn Renderer>,
    clock: Box<dyn Clock>,
    settings: DriverSettings,
    status_tx: watch::Sender<SequencerStatus>,
}

impl CycleDriver {
    pub fn new(
        sequencer: PlaylistSequencer,
        scheduler: DisplayPowerScheduler,
        renderer: Box<dyn Renderer>,
        clock: Box<dyn Clock>,
        settings: DriverSettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(sequencer.status());

        Self {
            sequencer,
            scheduler,
            renderer,
            clock,
            settings,
            status_tx,
        }
    }

    pub fn sequencer(&self) -> &PlaylistSequencer {
        &self.sequencer
    }

    pub fn scheduler(&self) -> &DisplayPowerScheduler {
        &self.scheduler
    }

    pub fn status_feed(&self) -> StatusFeed {
        StatusFeed {
            sequencer: self.status_tx.subscribe(),
            power: self.scheduler.subscribe(),
        }
    }

    /// One cycle: wait out the off-window, rotate if due, pick and show the
    /// next image. Only fatal errors are returned.
    pub async fn tick(&mut self) -> Result<()> {
        if self.settings.manage_power {
            let waits = self.scheduler.enforce(self.clock.as_ref()).await;
            if waits > 0 {
                log::debug!("Resumed after {} off-window checks", waits);
            }
        }

        self.sequencer.maybe_rotate_on_schedule();

        let next = self.sequencer.reconcile_and_advance();
        let result = self.show(next);
        self.publish();
        result
    }

    /// Applies a trigger. Returns true when the cycle timer should restart.
    pub fn apply(&mut self, trigger: Trigger) -> Result<bool> {
        match trigger {
            Trigger::RotateNow => {
                log::info!("Rotation requested");
                let next = self.sequencer.request_immediate_rotation();
                let result = self.show(next);
                self.publish();
                result?;
                Ok(true)
            }
            Trigger::ToggleScheduleMode => {
                if self.settings.manage_power {
                    self.scheduler.toggle_schedule_mode();
                } else {
                    log::warn!("Ignoring schedule toggle, power management is disabled");
                }
                Ok(false)
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        status_report(self.sequencer.status(), self.scheduler.power_status())
    }

    /// Ticks until `shutdown` resolves, the trigger channel closes or a fatal
    /// error occurs. Each tick is followed by a full cycle interval, however
    /// long the tick itself took.
    pub async fn run<S>(mut self, mut triggers: mpsc::Receiver<Trigger>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.settings.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        log::info!(
            "Cycling every {} through playlist '{}'",
            humantime::format_duration(self.settings.cycle_interval),
            self.sequencer.active_playlist()
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping slideshow");
                    return Ok(());
                }

                trigger = triggers.recv() => {
                    match trigger {
                        Some(trigger) => {
                            if self.apply(trigger)? {
                                ticker.reset();
                            }
                        }
                        None => {
                            log::info!("Control channel closed, stopping slideshow");
                            return Ok(());
                        }
                    }
                }

                _ = ticker.tick() => {
                    // A tick only yields inside the off-window sleep, so
                    // shutdown can interrupt it there and nowhere else.
                    tokio::select! {
                        biased;

                        _ = &mut shutdown => {
                            log::info!("Shutdown requested while the display is off, stopping slideshow");
                            return Ok(());
                        }

                        result = self.tick() => result?,
                    }
                    ticker.reset();
                }
            }
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.sequencer.status());
    }

    fn show(&mut self, next: Result<PathBuf>) -> Result<()> {
        let path = match next {
            Ok(path) => path,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                e.log_error("Skipping this cycle");
                return Ok(());
            }
        };

        if let Err(e) = self.renderer.render(&path) {
            SlideframeError::from(e).log_error("Failed to show image");
        }

        Ok(())
    }
}
