use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
pub use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::power::PowerToggle;

/// Consecutive toggle failures after which the failure is logged as an error.
const FAILURE_ESCALATION_THRESHOLD: u32 = 3;

/// Hours during which the display should be on: `on <= hour < off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnWindow {
    pub on: u32,
    pub off: u32,
}

impl OnWindow {
    pub const fn new(on: u32, off: u32) -> Self {
        Self { on, off }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.on <= hour && hour < self.off
    }
}

/// One on-window per day of the week, Monday first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [OnWindow; 7],
}

impl WeeklySchedule {
    pub fn new(days: [OnWindow; 7]) -> Self {
        Self { days }
    }

    pub fn window_for(&self, day: Weekday) -> OnWindow {
        self.days[day.num_days_from_monday() as usize]
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new([
            OnWindow::new(18, 21), // Mon
            OnWindow::new(18, 21), // Tue
            OnWindow::new(18, 21), // Wed
            OnWindow::new(18, 21), // Thu
            OnWindow::new(17, 22), // Fri
            OnWindow::new(10, 22), // Sat
            OnWindow::new(10, 21), // Sun
        ])
    }
}

/// The weekly table or a single override window applied every day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerSchedule {
    weekly: WeeklySchedule,
    override_window: OnWindow,
    use_override: bool,
}

impl PowerSchedule {
    pub fn new(weekly: WeeklySchedule, override_window: OnWindow, use_override: bool) -> Self {
        Self {
            weekly,
            override_window,
            use_override,
        }
    }

    pub fn window_for(&self, day: Weekday) -> OnWindow {
        if self.use_override {
            self.override_window
        } else {
            self.weekly.window_for(day)
        }
    }

    pub fn uses_override(&self) -> bool {
        self.use_override
    }

    /// Flips between the weekly table and the override window.
    pub fn toggle_mode(&mut self) -> bool {
        self.use_override = !self.use_override;
        self.use_override
    }
}

impl Default for PowerSchedule {
    fn default() -> Self {
        Self::new(WeeklySchedule::default(), OnWindow::new(12, 22), false)
    }
}

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    Unchanged,
    TurnedOn,
    TurnedOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStatus {
    pub display_on: bool,
    pub override_schedule: bool,
}

/// Keeps the physical display powered according to the schedule.
pub struct DisplayPowerScheduler {
    schedule: PowerSchedule,
    display_on: bool,
    toggle: Box<dyn PowerToggle>,
    consecutive_failures: u32,
    retry_interval: Duration,
    status_tx: watch::Sender<PowerStatus>,
}

impl DisplayPowerScheduler {
    pub fn new(schedule: PowerSchedule, toggle: Box<dyn PowerToggle>, retry_interval: Duration) -> Self {
        let (status_tx, _) = watch::channel(PowerStatus {
            display_on: true,
            override_schedule: schedule.uses_override(),
        });

        Self {
            schedule,
            display_on: true,
            toggle,
            consecutive_failures: 0,
            retry_interval,
            status_tx,
        }
    }

    /// Power state updates, readable while `enforce` is waiting.
    pub fn subscribe(&self) -> watch::Receiver<PowerStatus> {
        self.status_tx.subscribe()
    }

    pub fn power_status(&self) -> PowerStatus {
        PowerStatus {
            display_on: self.display_on,
            override_schedule: self.schedule.uses_override(),
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.power_status());
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    pub fn schedule(&self) -> &PowerSchedule {
        &self.schedule
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn is_within_on_window(&self, now: NaiveDateTime) -> bool {
        self.schedule.window_for(now.weekday()).contains(now.hour())
    }

    /// Makes sure the output is on when the daemon starts.
    pub fn power_on_at_startup(&mut self) {
        self.switch(true);
        log::info!("Display switched on at startup");
    }

    /// Brings the power state in line with the schedule at `now`.
    pub fn reconcile(&mut self, now: NaiveDateTime) -> PowerTransition {
        let within = self.is_within_on_window(now);

        if within && !self.display_on {
            self.switch(true);
            log::info!("{}: Display turned on.", now);
            PowerTransition::TurnedOn
        } else if !within && self.display_on {
            self.switch(false);
            log::info!("{}: Display turned off.", now);
            PowerTransition::TurnedOff
        } else {
            PowerTransition::Unchanged
        }
    }

    /// Reconciles, then waits out the off-window: sleeps the retry interval
    /// and re-checks with fresh time until the schedule says "on" again.
    /// Returns how many times it slept.
    ///
    /// Cancel safe: the only await point is the retry sleep, and the power
    /// state is consistent whenever it is reached.
    pub async fn enforce(&mut self, clock: &dyn Clock) -> u32 {
        let mut waits = 0;

        loop {
            let now = clock.now();
            self.reconcile(now);

            if self.is_within_on_window(now) {
                return waits;
            }

            log::info!(
                "{}: Display is off. Sleeping for {}.",
                now,
                humantime::format_duration(self.retry_interval)
            );
            tokio::time::sleep(self.retry_interval).await;
            waits += 1;
        }
    }

    pub fn toggle_schedule_mode(&mut self) -> bool {
        let use_override = self.schedule.toggle_mode();
        self.publish();
        log::info!(
            "Changed schedule: using {}",
            if use_override { "override window" } else { "weekly schedule" }
        );
        use_override
    }

    // PowerState follows the request even when the command fails, so a
    // flaky output never stalls the slideshow.
    fn switch(&mut self, on: bool) {
        let report = self.toggle.set_display_power(on);
        let action = if on { "on" } else { "off" };

        if report.success {
            self.consecutive_failures = 0;
            log::debug!("Display power {} command succeeded: {}", action, report.diagnostic);
        } else {
            self.consecutive_failures += 1;
            log::warn!("Display power {} command failed: {}", action, report.diagnostic);

            if self.consecutive_failures >= FAILURE_ESCALATION_THRESHOLD {
                log::error!(
                    "Display power command failed {} times in a row; the display may not follow the schedule",
                    self.consecutive_failures
                );
            }
        }

        self.display_on = on;
        self.publish();
    }
}
