//! Mode state machine and the decisions that map (mode, temperature, setpoint)
//! to indicator output, display content and timed reports.
//!
//! [`ControlCore`] performs no I/O. Whoever drives it supplies the temperature
//! and the current time, and delivers whatever it produces to the peripherals.

mod types;

use std::fmt::Display;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone};

pub use crate::control::types::{
    ActuatorDirective, ChannelState, Command, DisplayContent, InvalidCommand, Mode, Report,
};

pub const DEFAULT_SETPOINT: i32 = 72;
pub const REPORT_INTERVAL: Duration = Duration::from_secs(30);
pub const DISPLAY_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlConfig {
    pub report_interval: Duration,
    /// How often the driving loop ticks. Not consulted by the core itself.
    pub refresh_interval: Duration,
    pub default_setpoint: i32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            report_interval: REPORT_INTERVAL,
            refresh_interval: DISPLAY_REFRESH_INTERVAL,
            default_setpoint: DEFAULT_SETPOINT,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControlCore {
    mode: Mode,
    setpoint: i32,
    last_report_time: Instant,
}

impl ControlCore {
    pub fn new(setpoint: i32, now: Instant) -> ControlCore {
        ControlCore {
            mode: Mode::default(),
            setpoint,
            last_report_time: now,
        }
    }

    pub fn from_config(config: &ControlConfig, now: Instant) -> ControlCore {
        Self::new(config.default_setpoint, now)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn setpoint(&self) -> i32 {
        self.setpoint
    }

    pub fn last_report_time(&self) -> Instant {
        self.last_report_time
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = self.mode.next();
        info!("mode changed to {}", self.mode);
        self.mode
    }

    /// Steps wrap at the ends of the `i32` range, so an increase followed by
    /// a decrease always lands back on the same set point.
    pub fn increase_setpoint(&mut self) -> i32 {
        self.setpoint = self.setpoint.wrapping_add(1);
        info!("set point increased to {}°F", self.setpoint);
        self.setpoint
    }

    pub fn decrease_setpoint(&mut self) -> i32 {
        self.setpoint = self.setpoint.wrapping_sub(1);
        info!("set point decreased to {}°F", self.setpoint);
        self.setpoint
    }

    /// Applies a mutating command. [`Command::Quit`] belongs to the driving
    /// loop and leaves the core untouched.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::ToggleMode => {
                self.toggle_mode();
            }
            Command::IncreaseSetpoint => {
                self.increase_setpoint();
            }
            Command::DecreaseSetpoint => {
                self.decrease_setpoint();
            }
            Command::Quit => trace!("quit is not a core command, ignoring"),
        }
    }

    /// Strict threshold rule with no deadband, so the active channel may flip
    /// between fading and solid on consecutive ticks near the setpoint.
    pub fn compute_actuator_directive(&self, current_temp: f64) -> ActuatorDirective {
        let setpoint = f64::from(self.setpoint);
        match self.mode {
            Mode::Off => ActuatorDirective::off(),
            Mode::Heat => ActuatorDirective::new(
                if current_temp < setpoint {
                    ChannelState::Fading
                } else {
                    ChannelState::Solid
                },
                ChannelState::Off,
            ),
            Mode::Cool => ActuatorDirective::new(
                ChannelState::Off,
                if current_temp > setpoint {
                    ChannelState::Fading
                } else {
                    ChannelState::Solid
                },
            ),
        }
    }

    pub fn compute_display_content<Tz: TimeZone>(
        &self,
        current_temp: f64,
        now: &DateTime<Tz>,
    ) -> DisplayContent
    where
        Tz::Offset: Display,
    {
        DisplayContent {
            line1: now.format(TIMESTAMP_FORMAT).to_string(),
            line2: format!(
                "Mode: {:<4} | Cur: {:.1}°F | Set: {}°F",
                self.mode.name(),
                current_temp,
                self.setpoint
            ),
        }
    }

    /// Builds a report once at least `interval` has passed since the last one.
    /// A `now` earlier than the last report never yields one.
    pub fn maybe_build_report(
        &mut self,
        current_temp: f64,
        now: Instant,
        interval: Duration,
    ) -> Option<Report> {
        let elapsed = now.checked_duration_since(self.last_report_time)?;
        if elapsed < interval {
            trace!("next report due in {:?}", interval - elapsed);
            return None;
        }
        self.last_report_time = now;
        let report = Report {
            mode: self.mode,
            temperature: current_temp,
            setpoint: self.setpoint,
        };
        debug!("report due after {:?}: {}", elapsed, report);
        Some(report)
    }
}
