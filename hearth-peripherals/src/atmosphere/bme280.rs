use std::thread::sleep;
use std::time::Duration;

use rppal::i2c::I2c;

use crate::atmosphere::calibration::{raw_temperature, TemperatureCalibration};
use crate::atmosphere::{celsius_to_fahrenheit, AtmosphereError, Result, TemperatureSource};
use crate::{I2cError, RppalError};

const ATMOSPHERE_ADDR: u16 = 0x76;

const STATUS_POLL: Duration = Duration::from_millis(2);
const STATUS_ATTEMPTS: usize = 50;

#[derive(Clone, Copy, Debug)]
enum Register {
    ChipId,
    SoftReset,
    Status,
    CtrlMeas,
    DigT1,
    TempData,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        match r {
            Register::ChipId => 0xd0,
            Register::SoftReset => 0xe0,
            Register::Status => 0xf3,
            Register::CtrlMeas => 0xf4,
            Register::DigT1 => 0x88,
            Register::TempData => 0xfa,
        }
    }
}

/// Temperature-only BME280 driver running one forced measurement per read.
pub struct Bme280 {
    i2c: I2c,
    calibration: TemperatureCalibration,
}

impl Bme280 {
    const CHIP_ID: u8 = 0x60;
    const RESET_WORD: u8 = 0xb6;
    // temperature oversampling x1, pressure skipped, forced mode
    const FORCED_TEMPERATURE: u8 = 0b001 << 5 | 0b01;

    pub fn new(addr: u16) -> Result<Bme280> {
        let mut i2c = I2c::new().map_err(|_| I2cError::Initialization)?;
        i2c.set_slave_address(addr)
            .map_err(|_| I2cError::SlaveAddr(addr))?;

        let [chip_id] = Self::read_from::<1>(&i2c, Register::ChipId)?;
        if chip_id != Self::CHIP_ID {
            return Err(AtmosphereError::ChipId(chip_id));
        }
        Self::write_to(&i2c, Register::SoftReset, Self::RESET_WORD)?;
        sleep(Duration::from_millis(4));

        let trim = Self::read_from::<{ TemperatureCalibration::LEN }>(&i2c, Register::DigT1)?;
        let calibration = TemperatureCalibration::from_registers(&trim)?;
        debug!("bme280 at {:#04x} calibrated with {:?}", addr, calibration);

        Ok(Bme280 { i2c, calibration })
    }

    pub fn default_addr() -> Result<Self> {
        Self::new(ATMOSPHERE_ADDR)
    }

    fn read_from<const N: usize>(i2c: &I2c, register: Register) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        i2c.write_read(&[register.into()], &mut buf)
            .map_err(RppalError::from)?;
        Ok(buf)
    }

    fn write_to(i2c: &I2c, register: Register, value: u8) -> Result<()> {
        i2c.smbus_write_byte(register.into(), value)
            .map_err(RppalError::from)?;
        Ok(())
    }

    fn until_measured(&self) -> Result<()> {
        for _ in 0..STATUS_ATTEMPTS {
            let [status] = Self::read_from::<1>(&self.i2c, Register::Status)?;
            if status & 0x08 == 0 {
                return Ok(());
            }
            sleep(STATUS_POLL);
        }
        Err(AtmosphereError::NotReady)
    }

    pub fn read_celsius(&mut self) -> Result<f64> {
        Self::write_to(&self.i2c, Register::CtrlMeas, Self::FORCED_TEMPERATURE)?;
        self.until_measured()?;
        let data = Self::read_from::<3>(&self.i2c, Register::TempData)?;
        let celsius = self.calibration.compensate(raw_temperature(data));
        trace!("read temperature {}°C from raw {:X?}", celsius, data);
        Ok(celsius)
    }
}

impl TemperatureSource for Bme280 {
    type Error = AtmosphereError;

    fn read_temperature(&mut self) -> Result<f64> {
        self.read_celsius().map(celsius_to_fahrenheit)
    }
}
