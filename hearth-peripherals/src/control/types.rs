use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, AsRefStr, Display, EnumIter)]
pub enum Mode {
    #[strum(serialize = "OFF")]
    Off,
    #[strum(serialize = "HEAT")]
    Heat,
    #[strum(serialize = "COOL")]
    Cool,
}

impl Mode {
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    /// Next mode in the Off -> Heat -> Cool -> Off cycle.
    pub fn next(self) -> Mode {
        match self {
            Mode::Off => Mode::Heat,
            Mode::Heat => Mode::Cool,
            Mode::Cool => Mode::Off,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Off
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter)]
pub enum ChannelState {
    Off,
    Fading,
    Solid,
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState::Off
    }
}

/// Desired state of both indicator channels. `primary` is the heating
/// indicator, `secondary` the cooling one.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct ActuatorDirective {
    pub primary: ChannelState,
    pub secondary: ChannelState,
}

impl ActuatorDirective {
    pub fn new(primary: ChannelState, secondary: ChannelState) -> ActuatorDirective {
        ActuatorDirective { primary, secondary }
    }

    pub fn off() -> ActuatorDirective {
        Self::default()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct DisplayContent {
    pub line1: String,
    pub line2: String,
}

impl DisplayContent {
    pub fn lines(&self) -> [&str; 2] {
        [&self.line1, &self.line2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub mode: Mode,
    pub temperature: f64,
    pub setpoint: i32,
}

impl Report {
    pub fn payload(&self) -> String {
        self.to_string()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{:.1},{}", self.mode, self.temperature, self.setpoint)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Command {
    ToggleMode,
    IncreaseSetpoint,
    DecreaseSetpoint,
    Quit,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("Invalid command \"{0}\"")]
pub struct InvalidCommand(pub String);

impl FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "mode" | "toggle" => Ok(Command::ToggleMode),
            "2" | "+" | "up" => Ok(Command::IncreaseSetpoint),
            "3" | "-" | "down" => Ok(Command::DecreaseSetpoint),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            other => Err(InvalidCommand(other.to_string())),
        }
    }
}
