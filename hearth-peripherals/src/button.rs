use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Trigger};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::control::Command;
use crate::{I2cError, RppalError};

const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum ButtonError {
    #[error(transparent)]
    I2cError(#[from] I2cError),
    #[error("Could not set up button interrupt handler")]
    Interrupt(#[from] RppalError),
}

pub type Result<T> = std::result::Result<T, ButtonError>;

#[derive(Debug, Clone, Copy)]
pub struct ButtonPins {
    pub mode: u8,
    pub up: u8,
    pub down: u8,
}

impl Default for ButtonPins {
    fn default() -> Self {
        Self {
            mode: 24,
            up: 25,
            down: 12,
        }
    }
}

/// Push buttons wired to ground, each turned into a [`Command`] on press.
/// Dropping this clears the interrupts.
#[derive(Debug)]
pub struct Buttons {
    pins: Vec<InputPin>,
}

impl Buttons {
    pub fn start(pins: ButtonPins, command_sender: mpsc::Sender<Command>) -> Result<Buttons> {
        let gpio = Gpio::new().map_err(|_| I2cError::Gpio)?;
        let pins = [
            (pins.mode, Command::ToggleMode),
            (pins.up, Command::IncreaseSetpoint),
            (pins.down, Command::DecreaseSetpoint),
        ]
        .iter()
        .map(|&(pin, command)| {
            let mut input = gpio
                .get(pin)
                .map_err(|_| I2cError::Pin(pin))?
                .into_input_pullup();
            Self::start_interrupt_handler(&mut input, command, command_sender.clone())?;
            info!("button on pin {} sends {:?}", pin, command);
            Ok(input)
        })
        .collect::<Result<Vec<_>>>()?;
        Ok(Buttons { pins })
    }

    pub fn default_pins(command_sender: mpsc::Sender<Command>) -> Result<Self> {
        Self::start(ButtonPins::default(), command_sender)
    }

    fn start_interrupt_handler(
        input: &mut InputPin,
        command: Command,
        command_sender: mpsc::Sender<Command>,
    ) -> Result<()> {
        let mut last_press: Option<Instant> = None;
        input
            .set_async_interrupt(Trigger::FallingEdge, move |_| {
                let now = Instant::now();
                if matches!(last_press, Some(last) if now.duration_since(last) < DEBOUNCE) {
                    trace!("debounced {:?}", command);
                    return;
                }
                last_press = Some(now);
                if let Err(e) = command_sender.try_send(command) {
                    warn!("dropping button press {:?}: {}", command, e);
                }
            })
            .map_err(RppalError::from)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        for pin in self.pins.iter_mut() {
            if let Err(e) = pin.clear_async_interrupt() {
                error!("could not clear button interrupt handler: {:?}", e);
            }
        }
    }
}
