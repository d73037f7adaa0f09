use std::io::{self, Stdout, Write};

use thiserror::Error;

use crate::control::DisplayContent;
use crate::I2cError;

pub const LCD_COLUMNS: usize = 16;

const PANEL_RULE_WIDTH: usize = 40;

#[derive(Error, Debug)]
pub enum LcdError {
    #[error(transparent)]
    I2cError(#[from] I2cError),
    #[error("Could not send message to lcd thread")]
    Send,
    #[error("Could not wait for lcd thread to stop")]
    ThreadWait,
    #[error("Could not write simulated lcd panel")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, LcdError>;

/// Anything able to render the two status lines.
pub trait DisplaySink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn show(&mut self, content: &DisplayContent) -> std::result::Result<(), Self::Error>;
}

/// Maps a character onto the ST7032 character rom. The rom keeps the degree
/// sign at 0xdf; anything else outside printable ascii becomes `?`.
pub fn encode_char(c: char) -> u8 {
    match c {
        '°' => 0xdf,
        ' '..='~' => c as u8,
        _ => b'?',
    }
}

/// Encodes a line for a display `columns` wide, cut off or padded with spaces.
pub fn fit_line(line: &str, columns: usize) -> Vec<u8> {
    line.chars()
        .map(encode_char)
        .chain(std::iter::repeat(b' '))
        .take(columns)
        .collect()
}

#[derive(Debug)]
pub struct SimulatedLcd<W: Write> {
    out: W,
}

impl<W: Write> SimulatedLcd<W> {
    pub fn new(out: W) -> SimulatedLcd<W> {
        SimulatedLcd { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl SimulatedLcd<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> DisplaySink for SimulatedLcd<W> {
    type Error = LcdError;

    fn show(&mut self, content: &DisplayContent) -> Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "[LCD DISPLAY]")?;
        for line in content.lines() {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out, "{}", "-".repeat(PANEL_RULE_WIDTH))?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(feature = "rpi")]
pub use crate::lcd::i2c::Lcd;

#[cfg(feature = "rpi")]
mod i2c {
    use std::{sync::mpsc, thread::sleep, time::Duration};

    use rppal::i2c::I2c;
    use tokio::task::{spawn_blocking, JoinHandle};

    use super::{fit_line, DisplaySink, LcdError, Result, LCD_COLUMNS};
    use crate::control::DisplayContent;
    use crate::I2cError;

    const LCD_SLAVE_ADDR: u16 = 0x3e;

    #[derive(Debug, Clone)]
    enum LcdMessage {
        Char(u8),
        Cmd(u8, u8),
        Wait(Duration),
        Stop,
    }

    /// ST7032 based 16x2 character display. Writes happen on a blocking
    /// thread, fed through a channel.
    #[derive(Debug)]
    pub struct Lcd {
        write_handle: JoinHandle<()>,
        write_sender: mpsc::Sender<LcdMessage>,
    }

    impl Lcd {
        const INIT_SEQ: [LcdMessage; 9] = [
            LcdMessage::Cmd(0, 0x38),
            LcdMessage::Cmd(0, 0x39),
            LcdMessage::Cmd(0, 0x14),
            LcdMessage::Cmd(0, 0x70),
            LcdMessage::Cmd(0, 0x56),
            LcdMessage::Cmd(0, 0x6c),
            LcdMessage::Wait(Duration::from_millis(250)),
            LcdMessage::Cmd(0, 0x38),
            LcdMessage::Cmd(0, 0x0c),
        ];

        pub fn new(slave_addr: u16) -> Result<Lcd> {
            let mut i2c = I2c::new().map_err(|_| I2cError::Initialization)?;
            i2c.set_slave_address(slave_addr)
                .map_err(|_| I2cError::SlaveAddr(slave_addr))?;
            let (write_sender, write_receiver) = mpsc::channel();
            let write_handle = spawn_blocking(move || {
                info!("starting lcd messaging thread, slave addr {}", slave_addr);
                while let Ok(next_msg) = write_receiver.recv() {
                    let res = match next_msg {
                        LcdMessage::Char(c) => i2c.write(&[0x40, c]).map(|_| ()),
                        LcdMessage::Cmd(ctrl, data) => i2c.write(&[ctrl, data]).map(|_| ()),
                        LcdMessage::Wait(duration) => {
                            sleep(duration);
                            Ok(())
                        }
                        LcdMessage::Stop => {
                            trace!("stopping lcd messaging thread");
                            break;
                        }
                    };
                    if let Err(e) = res {
                        error!("error in lcd messaging thread: {}", e);
                    }
                }
                info!("lcd messaging thread stopping");
            });
            let lcd = Lcd {
                write_handle,
                write_sender,
            };
            lcd.init()?;
            Ok(lcd)
        }

        pub fn default_addr() -> Result<Self> {
            Self::new(LCD_SLAVE_ADDR)
        }

        fn send(&self, msg: LcdMessage) -> Result<()> {
            self.write_sender.send(msg).map_err(|_| LcdError::Send)
        }

        fn init(&self) -> Result<()> {
            trace!("initializing lcd");
            Self::INIT_SEQ
                .iter()
                .cloned()
                .try_for_each(|msg| self.send(msg))
        }

        pub fn clear(&self) -> Result<()> {
            self.send(LcdMessage::Cmd(0, 0x01))?;
            self.send(LcdMessage::Wait(Duration::from_millis(2)))
        }

        fn line_head(&self, row: usize) -> Result<()> {
            let address = if row == 0 { 0x80 } else { 0xc0 };
            self.send(LcdMessage::Cmd(0, address))?;
            self.send(LcdMessage::Wait(Duration::from_micros(50)))
        }

        fn write_line(&self, row: usize, line: &str) -> Result<()> {
            self.line_head(row)?;
            fit_line(line, LCD_COLUMNS).into_iter().try_for_each(|c| {
                self.send(LcdMessage::Char(c))?;
                self.send(LcdMessage::Wait(Duration::from_micros(50)))
            })
        }

        pub async fn shutdown(mut self) -> Result<()> {
            trace!("shutting down lcd");
            self.clear()?;
            self.send(LcdMessage::Stop)?;
            (&mut self.write_handle)
                .await
                .map_err(|_| LcdError::ThreadWait)
        }
    }

    impl DisplaySink for Lcd {
        type Error = LcdError;

        fn show(&mut self, content: &DisplayContent) -> Result<()> {
            for (row, line) in content.lines().iter().enumerate() {
                self.write_line(row, line)?;
            }
            Ok(())
        }
    }
}
