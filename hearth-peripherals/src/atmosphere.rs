use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::I2cError;

#[cfg(feature = "rpi")]
mod bme280;
mod calibration;

#[cfg(feature = "rpi")]
pub use crate::atmosphere::bme280::Bme280;
pub use crate::atmosphere::calibration::{raw_temperature, TemperatureCalibration};

/// Anything that can produce an ambient temperature in Fahrenheit.
pub trait TemperatureSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn read_temperature(&mut self) -> std::result::Result<f64, Self::Error>;
}

#[derive(Error, Debug)]
pub enum AtmosphereError {
    #[error(transparent)]
    I2cError(#[from] I2cError),
    #[cfg(feature = "rpi")]
    #[error(transparent)]
    Transfer(#[from] crate::RppalError),
    #[error("Unexpected chip id {0:#04x}")]
    ChipId(u8),
    #[error("Could not unpack calibration data: {0}")]
    Calibration(String),
    #[error("Measurement did not finish in time")]
    NotReady,
    #[error("Invalid simulated temperature range {0}..={1}")]
    InvalidRange(f64, f64),
}

pub type Result<T> = std::result::Result<T, AtmosphereError>;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub const SIMULATED_RANGE: RangeInclusive<f64> = 65.0..=80.0;

/// Uniformly random readings rounded to a tenth of a degree.
#[derive(Debug)]
pub struct SimulatedAtmosphere {
    range: RangeInclusive<f64>,
    rng: StdRng,
}

impl SimulatedAtmosphere {
    pub fn new(range: RangeInclusive<f64>) -> Result<SimulatedAtmosphere> {
        Self::with_rng(range, StdRng::from_entropy())
    }

    pub fn seeded(range: RangeInclusive<f64>, seed: u64) -> Result<SimulatedAtmosphere> {
        Self::with_rng(range, StdRng::seed_from_u64(seed))
    }

    fn with_rng(range: RangeInclusive<f64>, rng: StdRng) -> Result<SimulatedAtmosphere> {
        let (min, max) = (*range.start(), *range.end());
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(AtmosphereError::InvalidRange(min, max));
        }
        info!("simulating temperatures between {}°F and {}°F", min, max);
        Ok(SimulatedAtmosphere { range, rng })
    }
}

impl TemperatureSource for SimulatedAtmosphere {
    type Error = std::convert::Infallible;

    fn read_temperature(&mut self) -> std::result::Result<f64, Self::Error> {
        let temperature: f64 = self.rng.gen_range(self.range.clone());
        let rounded = (temperature * 10.0).round() / 10.0;
        trace!("simulated temperature {}", rounded);
        Ok(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert!((celsius_to_fahrenheit(25.08) - 77.144).abs() < 0.001);
    }

    #[test]
    fn simulated_readings_stay_in_range() {
        let mut atmo = SimulatedAtmosphere::seeded(SIMULATED_RANGE, 7).unwrap();
        for _ in 0..500 {
            let temperature = atmo.read_temperature().unwrap();
            assert!((65.0..=80.0).contains(&temperature), "{}", temperature);
            let tenths = temperature * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-3, "{}", temperature);
        }
    }

    #[test]
    fn seeded_simulation_is_reproducible() {
        let mut a = SimulatedAtmosphere::seeded(SIMULATED_RANGE, 42).unwrap();
        let mut b = SimulatedAtmosphere::seeded(SIMULATED_RANGE, 42).unwrap();
        for _ in 0..10 {
            assert_eq!(a.read_temperature().unwrap(), b.read_temperature().unwrap());
        }
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(matches!(
            SimulatedAtmosphere::new(80.0..=65.0),
            Err(AtmosphereError::InvalidRange(_, _))
        ));
        assert!(SimulatedAtmosphere::new(f64::NAN..=65.0).is_err());
    }
}
