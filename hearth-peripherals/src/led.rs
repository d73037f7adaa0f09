use std::io::{self, Stdout, Write};
use std::time::Duration;

use num_traits::clamp;
use thiserror::Error;

use crate::control::ChannelState;
use crate::I2cError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Leds {
    Red,
    Blue,
}

impl From<Leds> for u8 {
    fn from(l: Leds) -> Self {
        match l {
            Leds::Red => 18,
            Leds::Blue => 23,
        }
    }
}

impl Leds {
    pub fn label(&self) -> &'static str {
        match self {
            Leds::Red => "RED",
            Leds::Blue => "BLUE",
        }
    }
}

#[derive(Error, Debug)]
pub enum LedError {
    #[error(transparent)]
    I2cError(#[from] I2cError),
    #[error("Could not send state to led thread")]
    Send,
    #[error("Could not wait for led thread to stop")]
    ThreadWait,
    #[error("Could not write simulated led state")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, LedError>;

/// One indicator channel.
pub trait Indicator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn set(&mut self, state: ChannelState) -> std::result::Result<(), Self::Error>;
}

pub const FADE_PERIOD: Duration = Duration::from_secs(2);

/// Triangle wave brightness for a fading led, 0 at the start of each period
/// and 1 half way through.
pub fn fade_duty(elapsed: Duration, period: Duration) -> f64 {
    if period.is_zero() {
        return 1.0;
    }
    let phase = (elapsed.as_secs_f64() / period.as_secs_f64()).fract();
    clamp(1.0 - (2.0 * phase - 1.0).abs(), 0.0, 1.0)
}

/// Writes each requested state as a line, the way a bench wiring log reads.
#[derive(Debug)]
pub struct SimulatedLed<W: Write> {
    led: Leds,
    state: ChannelState,
    out: W,
}

impl<W: Write> SimulatedLed<W> {
    pub fn new(led: Leds, out: W) -> SimulatedLed<W> {
        SimulatedLed {
            led,
            state: ChannelState::Off,
            out,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl SimulatedLed<Stdout> {
    pub fn stdout(led: Leds) -> Self {
        Self::new(led, io::stdout())
    }
}

impl<W: Write> Indicator for SimulatedLed<W> {
    type Error = LedError;

    fn set(&mut self, state: ChannelState) -> Result<()> {
        let description = match state {
            ChannelState::Off => "off.",
            ChannelState::Fading => "fading in/out...",
            ChannelState::Solid => "solid on.",
        };
        writeln!(self.out, "   [{} LED] {}", self.led.label(), description)?;
        self.out.flush()?;
        self.state = state;
        Ok(())
    }
}

#[cfg(feature = "rpi")]
pub use crate::led::gpio::Led;

#[cfg(feature = "rpi")]
mod gpio {
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, Instant};

    use rppal::gpio::{Gpio, OutputPin};

    use super::{fade_duty, Indicator, LedError, Leds, Result, FADE_PERIOD};
    use crate::control::ChannelState;
    use crate::I2cError;

    const PWM_FREQUENCY: f64 = 200.0;
    const FADE_STEP: Duration = Duration::from_millis(20);

    #[derive(Debug, Clone, Copy)]
    enum LedMessage {
        Set(ChannelState),
        Stop,
    }

    /// GPIO led driven from its own thread so fading keeps running between
    /// ticks.
    #[derive(Debug)]
    pub struct Led {
        state: ChannelState,
        state_sender: mpsc::Sender<LedMessage>,
        handle: Option<JoinHandle<()>>,
    }

    impl Led {
        pub fn new(pin: u8) -> Result<Led> {
            let out = Gpio::new()
                .map_err(|_| I2cError::Gpio)?
                .get(pin)
                .map_err(|_| I2cError::Pin(pin))?
                .into_output();
            let (state_sender, state_receiver) = mpsc::channel();
            let handle = thread::spawn(move || Self::drive(pin, out, state_receiver));
            Ok(Led {
                state: ChannelState::Off,
                state_sender,
                handle: Some(handle),
            })
        }

        pub fn from_led(led: Leds) -> Result<Led> {
            Self::new(u8::from(led))
        }

        pub fn state(&self) -> ChannelState {
            self.state
        }

        fn drive(pin: u8, mut out: OutputPin, state_receiver: mpsc::Receiver<LedMessage>) {
            info!("starting led thread for pin {}", pin);
            let mut state = ChannelState::Off;
            let mut fade_start = Instant::now();
            loop {
                let timeout = if state == ChannelState::Fading {
                    FADE_STEP
                } else {
                    Duration::from_secs(3600)
                };
                match state_receiver.recv_timeout(timeout) {
                    Ok(LedMessage::Set(next)) => {
                        if next == state {
                            continue;
                        }
                        trace!("led on pin {} switching to {}", pin, next);
                        state = next;
                        fade_start = Instant::now();
                        let res = match state {
                            ChannelState::Off | ChannelState::Solid => out.clear_pwm(),
                            ChannelState::Fading => out.set_pwm_frequency(PWM_FREQUENCY, 0.0),
                        };
                        match state {
                            ChannelState::Off => out.set_low(),
                            ChannelState::Solid => out.set_high(),
                            ChannelState::Fading => {}
                        }
                        if let Err(e) = res {
                            error!("could not drive led on pin {}: {}", pin, e);
                        }
                    }
                    Ok(LedMessage::Stop) => {
                        trace!("stopping led thread for pin {}", pin);
                        break;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if state == ChannelState::Fading {
                            let duty = fade_duty(fade_start.elapsed(), FADE_PERIOD);
                            if let Err(e) = out.set_pwm_frequency(PWM_FREQUENCY, duty) {
                                error!("could not fade led on pin {}: {}", pin, e);
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        info!("led state sender disconnected before stop signal");
                        break;
                    }
                }
            }
            if let Err(e) = out.clear_pwm() {
                error!("could not clear pwm on pin {}: {}", pin, e);
            }
            out.set_low();
        }

        pub fn stop(&mut self) -> Result<()> {
            self.state_sender
                .send(LedMessage::Stop)
                .map_err(|_| LedError::Send)?;
            if let Some(handle) = self.handle.take() {
                handle.join().map_err(|_| LedError::ThreadWait)?;
            }
            Ok(())
        }
    }

    impl Indicator for Led {
        type Error = LedError;

        fn set(&mut self, state: ChannelState) -> Result<()> {
            self.state_sender
                .send(LedMessage::Set(state))
                .map_err(|_| LedError::Send)?;
            self.state = state;
            Ok(())
        }
    }

    impl Drop for Led {
        fn drop(&mut self) {
            if self.handle.is_some() {
                if let Err(e) = self.stop() {
                    error!("could not stop led thread: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leds_map_to_bcm_pins() {
        assert_eq!(u8::from(Leds::Red), 18);
        assert_eq!(u8::from(Leds::Blue), 23);
        assert_eq!(Leds::Blue.label(), "BLUE");
    }

    #[test]
    fn fade_is_a_triangle_wave() {
        let period = Duration::from_secs(2);
        assert_eq!(fade_duty(Duration::ZERO, period), 0.0);
        assert!((fade_duty(Duration::from_millis(500), period) - 0.5).abs() < 1e-9);
        assert!((fade_duty(Duration::from_secs(1), period) - 1.0).abs() < 1e-9);
        assert!((fade_duty(Duration::from_millis(2500), period) - 0.5).abs() < 1e-9);
        assert_eq!(fade_duty(Duration::from_secs(3), Duration::ZERO), 1.0);
    }

    #[test]
    fn simulated_led_describes_each_state() {
        let mut led = SimulatedLed::new(Leds::Red, Vec::new());
        led.set(ChannelState::Fading).unwrap();
        led.set(ChannelState::Solid).unwrap();
        assert_eq!(led.state(), ChannelState::Solid);
        led.set(ChannelState::Off).unwrap();
        let out = String::from_utf8(led.into_inner()).unwrap();
        assert_eq!(
            out,
            "   [RED LED] fading in/out...\n   [RED LED] solid on.\n   [RED LED] off.\n"
        );
    }
}
