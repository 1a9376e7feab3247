//! Integration protocol command families and message modes

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Message mode, carried by the first character of a line
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `#` - perform an action
    Execute,
    /// `?` - ask for current state
    Query,
    /// `~` - state report from the processor
    Response,
    /// `~ERROR` - processor rejected a command
    Error,
}

impl Mode {
    /// Wire character for this mode
    pub fn symbol(self) -> char {
        match self {
            Self::Execute => '#',
            Self::Query => '?',
            Self::Response | Self::Error => '~',
        }
    }

    /// Parse the leading mode character
    ///
    /// `~` always yields [`Mode::Response`]; error replies are recognised by
    /// their command family once the line is split.
    pub fn from_symbol(symbol: char) -> Result<Self> {
        match symbol {
            '#' => Ok(Self::Execute),
            '?' => Ok(Self::Query),
            '~' => Ok(Self::Response),
            other => Err(Error::UnknownMode(other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Command family
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    Area,
    Device,
    Output,
    Group,
    ShadeGroup,
    Ping,
    Monitoring,
    Error,
    Help,
    System,
}

impl Command {
    /// Wire name of the family
    pub fn name(self) -> &'static str {
        match self {
            Self::Area => "AREA",
            Self::Device => "DEVICE",
            Self::Output => "OUTPUT",
            Self::Group => "GROUP",
            Self::ShadeGroup => "SHADEGRP",
            Self::Ping => "PING",
            Self::Monitoring => "MONITORING",
            Self::Error => "ERROR",
            Self::Help => "HELP",
            Self::System => "SYSTEM",
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AREA" => Ok(Self::Area),
            "DEVICE" => Ok(Self::Device),
            "OUTPUT" => Ok(Self::Output),
            "GROUP" => Ok(Self::Group),
            "SHADEGRP" => Ok(Self::ShadeGroup),
            "PING" => Ok(Self::Ping),
            "MONITORING" => Ok(Self::Monitoring),
            "ERROR" => Ok(Self::Error),
            "HELP" => Ok(Self::Help),
            "SYSTEM" => Ok(Self::System),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        for command in [
            Command::Area,
            Command::Device,
            Command::Output,
            Command::Group,
            Command::ShadeGroup,
            Command::Ping,
            Command::Monitoring,
            Command::Error,
            Command::Help,
            Command::System,
        ] {
            assert_eq!(command.name().parse::<Command>().unwrap(), command);
        }
    }

    #[test]
    fn test_command_case_insensitive() {
        assert_eq!("shadegrp".parse::<Command>().unwrap(), Command::ShadeGroup);
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            "TIMECLOCK".parse::<Command>(),
            Err(Error::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_mode_symbols() {
        assert_eq!(Mode::from_symbol('#').unwrap(), Mode::Execute);
        assert_eq!(Mode::from_symbol('?').unwrap(), Mode::Query);
        assert_eq!(Mode::from_symbol('~').unwrap(), Mode::Response);
        assert!(Mode::from_symbol('!').is_err());
        assert_eq!(Mode::Error.symbol(), '~');
    }
}
