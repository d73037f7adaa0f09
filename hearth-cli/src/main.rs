mod input;
mod thermostat;

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

use std::io;
use std::time::{Duration, Instant};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use hearth_peripherals::atmosphere::{SimulatedAtmosphere, SIMULATED_RANGE};
use hearth_peripherals::control::ControlConfig;
use hearth_peripherals::lcd::SimulatedLcd;
use hearth_peripherals::led::{Leds, SimulatedLed};
use hearth_peripherals::uart::SimulatedUart;
use structopt::StructOpt;
use tokio::sync::mpsc;

use crate::input::{spawn_stdin_reader, CONTROLS};
use crate::thermostat::{Peripherals, Thermostat};

const COMMAND_QUEUE: usize = 16;

fn parse_seconds(src: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = src.parse().map_err(|e| format!("{}", e))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("{} is not a usable number of seconds", src));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn parse_refresh(src: &str) -> std::result::Result<Duration, String> {
    match parse_seconds(src)? {
        d if d.is_zero() => Err("refresh interval must be above zero".to_string()),
        d => Ok(d),
    }
}

#[cfg(feature = "rpi")]
fn parse_addr(src: &str) -> std::result::Result<u16, std::num::ParseIntError> {
    u16::from_str_radix(src.trim_start_matches("0x"), 16)
}

#[derive(StructOpt, Debug)]
struct ConfigOpt {
    /// Seconds between uart reports [default: 30]
    #[structopt(long, parse(try_from_str = parse_seconds))]
    report_interval: Option<Duration>,

    /// Seconds between display refreshes [default: 5]
    #[structopt(long, parse(try_from_str = parse_refresh))]
    refresh_interval: Option<Duration>,

    /// Initial set point in Fahrenheit [default: 72]
    #[structopt(long, allow_hyphen_values = true)]
    setpoint: Option<i32>,
}

impl ConfigOpt {
    fn into_config(self) -> ControlConfig {
        let defaults = ControlConfig::default();
        ControlConfig {
            report_interval: self.report_interval.unwrap_or(defaults.report_interval),
            refresh_interval: self.refresh_interval.unwrap_or(defaults.refresh_interval),
            default_setpoint: self.setpoint.unwrap_or(defaults.default_setpoint),
        }
    }
}

#[derive(StructOpt, Debug)]
enum RunOpt {
    /// Random sensor readings, console display and leds, commands from stdin
    Simulate {
        /// Lowest simulated temperature [default: 65.0]
        #[structopt(long, allow_hyphen_values = true)]
        min: Option<f64>,

        /// Highest simulated temperature [default: 80.0]
        #[structopt(long, allow_hyphen_values = true)]
        max: Option<f64>,

        /// Seed for reproducible readings
        #[structopt(long)]
        seed: Option<u64>,
    },
    /// BME280 sensor, i2c lcd, gpio leds and buttons, serial reports
    #[cfg(feature = "rpi")]
    Hardware {
        /// BME280 i2c address in hex
        #[structopt(long, parse(try_from_str = parse_addr))]
        sensor_addr: Option<u16>,

        /// Serial device for reports
        #[structopt(long)]
        uart: Option<String>,

        /// Serial baud rate
        #[structopt(long, default_value = "115200")]
        baud: u32,
    },
}

#[derive(StructOpt, Debug)]
#[structopt(name = "hearth", about = "Setpoint thermostat controller")]
struct Opt {
    #[structopt(flatten)]
    config: ConfigOpt,

    #[structopt(subcommand)]
    run: RunOpt,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let opts = Opt::from_args();

    debug!("opts: {:?}", opts);

    let config = opts.config.into_config();
    let (command_sender, mut command_receiver) = mpsc::channel(COMMAND_QUEUE);

    match opts.run {
        RunOpt::Simulate { min, max, seed } => {
            let min = min.unwrap_or(*SIMULATED_RANGE.start());
            let max = max.unwrap_or(*SIMULATED_RANGE.end());
            let sensor = match seed {
                Some(seed) => SimulatedAtmosphere::seeded(min..=max, seed),
                None => SimulatedAtmosphere::new(min..=max),
            }
            .wrap_err("Could not set up simulated sensor")?;
            let peripherals = Peripherals {
                sensor,
                display: SimulatedLcd::stdout(),
                heating: SimulatedLed::stdout(Leds::Red),
                cooling: SimulatedLed::stdout(Leds::Blue),
                reporter: SimulatedUart::stdout(),
            };

            println!("\n--- SMART THERMOSTAT SIMULATION STARTED ---");
            println!("{}", CONTROLS);
            spawn_stdin_reader(command_sender);

            let mut thermostat =
                Thermostat::new(config, peripherals, Instant::now()).with_echo(io::stdout());
            thermostat.run(&mut command_receiver).await?;
        }
        #[cfg(feature = "rpi")]
        RunOpt::Hardware {
            sensor_addr,
            uart,
            baud,
        } => {
            use hearth_peripherals::atmosphere::Bme280;
            use hearth_peripherals::button::Buttons;
            use hearth_peripherals::lcd::Lcd;
            use hearth_peripherals::led::Led;
            use hearth_peripherals::uart::Uart;

            let sensor = match sensor_addr {
                Some(addr) => Bme280::new(addr),
                None => Bme280::default_addr(),
            }
            .wrap_err("Could not set up temperature sensor")?;
            let reporter = match uart {
                Some(path) => Uart::new(&path, baud),
                None => Uart::default_port(),
            }
            .wrap_err("Could not open report uart")?;
            let peripherals = Peripherals {
                sensor,
                display: Lcd::default_addr().wrap_err("Could not set up lcd")?,
                heating: Led::from_led(Leds::Red).wrap_err("Could not set up heating led")?,
                cooling: Led::from_led(Leds::Blue).wrap_err("Could not set up cooling led")?,
                reporter,
            };
            let mut buttons =
                Buttons::default_pins(command_sender).wrap_err("Could not set up buttons")?;

            println!("Starting thermostat, press ctrl-c to stop");

            let mut thermostat = Thermostat::new(config, peripherals, Instant::now());
            thermostat.run(&mut command_receiver).await?;
            buttons.stop();
            thermostat
                .into_peripherals()
                .display
                .shutdown()
                .await
                .wrap_err("Could not shut down lcd")?;
        }
    }

    println!("\nShutting down thermostat...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_seconds() {
        assert_eq!(parse_seconds("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_seconds("0.5"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_seconds("0"), Ok(Duration::ZERO));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
        assert!(parse_refresh("0").is_err());
    }

    #[test]
    fn defaults_fill_missing_options() {
        let opts = Opt::from_iter(&["hearth", "--setpoint", "-4", "simulate"]);
        let config = opts.config.into_config();
        assert_eq!(config.default_setpoint, -4);
        assert_eq!(config.report_interval, Duration::from_secs(30));
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
    }

    #[test]
    fn simulated_range_bounds_are_optional() {
        match Opt::from_iter(&["hearth", "simulate", "--min", "-10.5"]).run {
            RunOpt::Simulate { min, max, seed } => {
                assert_eq!(min, Some(-10.5));
                assert_eq!(max, None);
                assert_eq!(seed, None);
            }
            #[cfg(feature = "rpi")]
            other => panic!("unexpected {:?}", other),
        }
    }
}
