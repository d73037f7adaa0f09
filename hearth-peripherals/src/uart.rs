use std::io::{self, Stdout, Write};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UartError {
    #[cfg(feature = "rpi")]
    #[error(transparent)]
    Serial(#[from] crate::RppalError),
    #[error("Short write, sent {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("Could not write simulated uart output")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, UartError>;

/// Transmits already formatted report payloads. Delivery is fire and forget.
pub trait ReportSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(&mut self, payload: &str) -> std::result::Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct SimulatedUart<W: Write> {
    out: W,
}

impl<W: Write> SimulatedUart<W> {
    pub fn new(out: W) -> SimulatedUart<W> {
        SimulatedUart { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl SimulatedUart<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ReportSink for SimulatedUart<W> {
    type Error = UartError;

    fn send(&mut self, payload: &str) -> Result<()> {
        writeln!(self.out, "[UART OUTPUT] {}", payload)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(feature = "rpi")]
pub use crate::uart::serial::Uart;

#[cfg(feature = "rpi")]
mod serial {
    use rppal::uart::{Parity, Uart as RppalUart};

    use super::{ReportSink, Result, UartError};
    use crate::RppalError;

    const UART_PATH: &str = "/dev/serial0";
    const BAUD_RATE: u32 = 115_200;

    /// Serial port sending one `\r\n` terminated line per report.
    pub struct Uart {
        uart: RppalUart,
    }

    impl Uart {
        pub fn new(path: &str, baud_rate: u32) -> Result<Uart> {
            let mut uart = RppalUart::with_path(path, baud_rate, Parity::None, 8, 1)
                .map_err(RppalError::from)?;
            uart.set_write_mode(true).map_err(RppalError::from)?;
            info!("opened uart {} at {} baud", path, baud_rate);
            Ok(Uart { uart })
        }

        pub fn default_port() -> Result<Self> {
            Self::new(UART_PATH, BAUD_RATE)
        }
    }

    impl ReportSink for Uart {
        type Error = UartError;

        fn send(&mut self, payload: &str) -> Result<()> {
            let line = format!("{}\r\n", payload);
            let written = self
                .uart
                .write(line.as_bytes())
                .map_err(RppalError::from)?;
            if written != line.len() {
                return Err(UartError::ShortWrite {
                    written,
                    expected: line.len(),
                });
            }
            trace!("sent report {}", payload);
            Ok(())
        }
    }
}
