use packed_struct::prelude::*;

use crate::atmosphere::{AtmosphereError, Result};

/// BME280 temperature trimming parameters, `dig_T1..dig_T3` starting at
/// register 0x88.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[packed_struct(endian = "lsb")]
pub struct TemperatureCalibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
}

impl TemperatureCalibration {
    pub const LEN: usize = 6;

    pub fn from_registers(raw: &[u8; 6]) -> Result<TemperatureCalibration> {
        Self::unpack(raw).map_err(|e| AtmosphereError::Calibration(format!("{:?}", e)))
    }

    /// Floating point compensation from the datasheet, in Celsius.
    pub fn compensate(&self, adc: u32) -> f64 {
        let adc = adc as f64;
        let (t1, t2, t3) = (self.t1 as f64, self.t2 as f64, self.t3 as f64);
        let var1 = (adc / 16384.0 - t1 / 1024.0) * t2;
        let var2 = adc / 131072.0 - t1 / 8192.0;
        let var2 = var2 * var2 * t3;
        (var1 + var2) / 5120.0
    }
}

/// Assembles the 20 bit reading from the msb, lsb and xlsb data registers.
pub fn raw_temperature(data: [u8; 3]) -> u32 {
    (data[0] as u32) << 12 | (data[1] as u32) << 4 | (data[2] as u32) >> 4
}
