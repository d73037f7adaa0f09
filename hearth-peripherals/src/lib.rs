#[macro_use]
extern crate log;

use thiserror::Error;

pub mod atmosphere;
#[cfg(feature = "rpi")]
pub mod button;
pub mod control;
pub mod lcd;
pub mod led;
pub mod uart;

#[derive(Error, Clone, Debug)]
pub enum I2cError {
    #[error("Could not initialize i2c")]
    Initialization,
    #[error("Could not set slave address to {0}")]
    SlaveAddr(u16),
    #[error("Could not initialize gpio")]
    Gpio,
    #[error("Could not get pin {0}")]
    Pin(u8),
}

#[cfg(feature = "rpi")]
#[derive(Error, Debug)]
pub enum RppalError {
    #[error(transparent)]
    Gpio(#[from] rppal::gpio::Error),
    #[error(transparent)]
    I2c(#[from] rppal::i2c::Error),
    #[error(transparent)]
    Uart(#[from] rppal::uart::Error),
}
