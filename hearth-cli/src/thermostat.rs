use std::fmt::Display;
use std::io::Write;
use std::time::Instant;

use chrono::{DateTime, Local, TimeZone};
use eyre::{Result, WrapErr};
use hearth_peripherals::atmosphere::TemperatureSource;
use hearth_peripherals::control::{
    ActuatorDirective, ChannelState, Command, ControlConfig, ControlCore, DisplayContent, Report,
};
use hearth_peripherals::lcd::DisplaySink;
use hearth_peripherals::led::Indicator;
use hearth_peripherals::uart::ReportSink;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug)]
pub struct Peripherals<T, D, P, S, R> {
    pub sensor: T,
    pub display: D,
    pub heating: P,
    pub cooling: S,
    pub reporter: R,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub temperature: f64,
    pub directive: ActuatorDirective,
    pub display: DisplayContent,
    pub report: Option<Report>,
}

/// Drives a [`ControlCore`] against a set of peripherals.
pub struct Thermostat<T, D, P, S, R> {
    config: ControlConfig,
    core: ControlCore,
    peripherals: Peripherals<T, D, P, S, R>,
    last_temperature: Option<f64>,
    echo: Option<Box<dyn Write + Send>>,
}

impl<T, D, P, S, R> Thermostat<T, D, P, S, R>
where
    T: TemperatureSource,
    D: DisplaySink,
    P: Indicator,
    S: Indicator,
    R: ReportSink,
{
    pub fn new(
        config: ControlConfig,
        peripherals: Peripherals<T, D, P, S, R>,
        now: Instant,
    ) -> Thermostat<T, D, P, S, R> {
        let core = ControlCore::from_config(&config, now);
        Thermostat {
            config,
            core,
            peripherals,
            last_temperature: None,
            echo: None,
        }
    }

    /// Echoes mode and set point changes to `out`, for interactive use.
    pub fn with_echo<W: Write + Send + 'static>(mut self, out: W) -> Self {
        self.echo = Some(Box::new(out));
        self
    }

    pub fn core(&self) -> &ControlCore {
        &self.core
    }

    pub fn peripherals(&self) -> &Peripherals<T, D, P, S, R> {
        &self.peripherals
    }

    pub fn into_peripherals(self) -> Peripherals<T, D, P, S, R> {
        self.peripherals
    }

    /// A failed or non-finite reading falls back to the last good one.
    fn acquire_temperature(&mut self) -> Option<f64> {
        match self.peripherals.sensor.read_temperature() {
            Ok(temperature) if temperature.is_finite() => {
                self.last_temperature = Some(temperature);
            }
            Ok(temperature) => warn!("discarding non-finite reading {}", temperature),
            Err(e) => warn!(
                "temperature unavailable ({}), last reading was {:?}",
                e, self.last_temperature
            ),
        }
        self.last_temperature
    }

    fn echo_change(&mut self, command: Command) {
        let message = match command {
            Command::ToggleMode => format!("\n[STATE CHANGE] → {}", self.core.mode()),
            Command::IncreaseSetpoint => {
                format!("[INPUT] Set point increased to {}°F", self.core.setpoint())
            }
            Command::DecreaseSetpoint => {
                format!("[INPUT] Set point decreased to {}°F", self.core.setpoint())
            }
            Command::Quit => return,
        };
        if let Some(out) = self.echo.as_mut() {
            if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
                error!("could not echo {:?}: {}", command, e);
            }
        }
    }

    fn drive(&mut self, directive: ActuatorDirective) {
        if let Err(e) = self.peripherals.heating.set(directive.primary) {
            error!("could not drive heating indicator: {}", e);
        }
        if let Err(e) = self.peripherals.cooling.set(directive.secondary) {
            error!("could not drive cooling indicator: {}", e);
        }
    }

    /// One pass of sample, command, directive, display and report. Returns
    /// `None` when no reading has been available yet; the command is still
    /// applied in that case.
    pub fn tick<Tz: TimeZone>(
        &mut self,
        command: Option<Command>,
        now: Instant,
        wall: &DateTime<Tz>,
    ) -> Option<TickOutcome>
    where
        Tz::Offset: Display,
    {
        let temperature = self.acquire_temperature();
        if let Some(command) = command {
            debug!("applying {:?}", command);
            self.core.apply(command);
            self.echo_change(command);
        }
        let temperature = match temperature {
            Some(temperature) => temperature,
            None => {
                warn!("no temperature reading yet, skipping tick");
                return None;
            }
        };
        trace!("tick at {}°F", temperature);

        let directive = self.core.compute_actuator_directive(temperature);
        self.drive(directive);

        let display = self.core.compute_display_content(temperature, wall);
        if let Err(e) = self.peripherals.display.show(&display) {
            error!("could not refresh display: {}", e);
        }

        let report = self
            .core
            .maybe_build_report(temperature, now, self.config.report_interval);
        if let Some(report) = &report {
            if let Err(e) = self.peripherals.reporter.send(&report.payload()) {
                error!("could not send report {}: {}", report, e);
            }
        }

        Some(TickOutcome {
            temperature,
            directive,
            display,
            report,
        })
    }

    /// Ticks every refresh interval, and immediately whenever a command
    /// arrives, until quit, ctrl-c or the command source closes.
    pub async fn run(&mut self, commands: &mut mpsc::Receiver<Command>) -> Result<()> {
        let mut refresh = time::interval(self.config.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);

        info!(
            "thermostat running, refresh every {:?}, report every {:?}",
            self.config.refresh_interval, self.config.report_interval
        );
        loop {
            let command = tokio::select! {
                biased;
                res = &mut ctrl_c => {
                    res.wrap_err("Could not listen for ctrl-c")?;
                    info!("interrupted");
                    break;
                }
                command = commands.recv() => match command {
                    Some(Command::Quit) => {
                        info!("quit requested");
                        break;
                    }
                    None => {
                        info!("command source closed");
                        break;
                    }
                    command => {
                        refresh.reset();
                        command
                    }
                },
                _ = refresh.tick() => None,
            };
            self.tick(command, Instant::now(), &Local::now());
        }
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(&mut self) {
        info!("switching indicators off");
        self.drive(ActuatorDirective::new(ChannelState::Off, ChannelState::Off));
    }
}
