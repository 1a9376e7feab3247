//! Integration protocol messages
//!
//! # Line Structure
//!
//! ```text
//! plain:         <mode><COMMAND>,<id>,<action>,<param>,...\r\n
//! componented:   <mode><COMMAND>,<id>,<component>,<action>,<param>,...\r\n
//! error reply:   ~ERROR,<code>\r\n
//! ```
//!
//! Whether a line is component-addressed cannot be told from the line itself,
//! only from the integration it belongs to. Incoming lines are therefore
//! parsed into an unshaped [`Envelope`] first and shaped per receiver.

use std::fmt;
use std::time::Duration;

use crate::{
    codec,
    command::{Command, Mode},
    constants::LINE_TERMINATOR,
    error::{Error, ErrorCode, Result},
};

/// How an integration addresses its actions
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Addressing {
    /// `COMMAND,id,action,...` (areas, outputs, shade groups)
    Plain,
    /// `COMMAND,id,component,action,...` (keypads, GRAFIK Eye units)
    Componented,
}

/// Protocol message
///
/// # Examples
///
/// ```
/// use nwkrust_core::{Command, Message};
///
/// let line = Message::execute(Command::Device, 5, 3).with_component(2).encode();
/// assert_eq!(line, "#DEVICE,5,2,3\r\n");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub mode: Mode,
    pub command: Command,
    /// Integration id, or the error code for [`Mode::Error`]
    pub integration_id: u32,
    pub component: Option<u32>,
    pub action: Option<u32>,
    pub params: Vec<String>,
}

impl Message {
    fn new(mode: Mode, command: Command, integration_id: u32, action: u32) -> Self {
        Self {
            mode,
            command,
            integration_id,
            component: None,
            action: Some(action),
            params: Vec::new(),
        }
    }

    /// Create an execute (`#`) message
    pub fn execute(command: Command, integration_id: u32, action: u32) -> Self {
        Self::new(Mode::Execute, command, integration_id, action)
    }

    /// Create a query (`?`) message
    pub fn query(command: Command, integration_id: u32, action: u32) -> Self {
        Self::new(Mode::Query, command, integration_id, action)
    }

    /// Address a component of the integration
    pub fn with_component(mut self, component: u32) -> Self {
        self.component = Some(component);
        self
    }

    /// Append a raw parameter
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Append a level parameter (`0.00`-`100.00`)
    pub fn level(self, level: f64) -> Self {
        self.param(codec::format_level(level))
    }

    /// Append a duration parameter (`HH:MM:SS`)
    pub fn duration(self, duration: Duration) -> Self {
        self.param(codec::format_duration(duration))
    }

    /// Addressing shape of this message
    pub fn addressing(&self) -> Addressing {
        if self.component.is_some() {
            Addressing::Componented
        } else {
            Addressing::Plain
        }
    }

    /// Encode to a wire line, terminator included
    pub fn encode(&self) -> String {
        let mut line = format!(
            "{}{},{}",
            self.mode.symbol(),
            self.command,
            self.integration_id
        );
        if let Some(component) = self.component {
            line.push_str(&format!(",{component}"));
        }
        if let Some(action) = self.action {
            line.push_str(&format!(",{action}"));
        }
        for param in &self.params {
            line.push(',');
            line.push_str(param);
        }
        line.push_str(LINE_TERMINATOR);
        line
    }

    /// Decode a line with a known addressing shape
    pub fn decode(line: &str, addressing: Addressing) -> Result<Self> {
        let envelope = Envelope::parse(line)?;

        if envelope.mode == Mode::Error {
            return Ok(Self {
                mode: Mode::Error,
                command: envelope.command,
                integration_id: envelope.integration_id,
                component: None,
                action: None,
                params: envelope.fields,
            });
        }

        let feedback = envelope.feedback(addressing)?;
        Ok(Self {
            mode: envelope.mode,
            command: envelope.command,
            integration_id: envelope.integration_id,
            component: feedback.component(),
            action: Some(feedback.action()),
            params: feedback.params().to_vec(),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode().trim_end())
    }
}

/// A parsed line whose addressing shape is not yet known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub mode: Mode,
    pub command: Command,
    pub integration_id: u32,
    /// Everything after the integration id
    pub fields: Vec<String>,
}

impl Envelope {
    /// Split a protocol line into mode, family, id and remaining fields
    ///
    /// # Examples
    ///
    /// ```
    /// use nwkrust_core::{Command, Envelope, Mode};
    ///
    /// let envelope = Envelope::parse("~OUTPUT,10,1,50.00\r\n").unwrap();
    /// assert_eq!(envelope.mode, Mode::Response);
    /// assert_eq!(envelope.command, Command::Output);
    /// assert_eq!(envelope.integration_id, 10);
    /// assert_eq!(envelope.fields, vec!["1", "50.00"]);
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let mut chars = line.chars();
        let symbol = chars.next().ok_or(Error::EmptyLine)?;
        let mut mode = Mode::from_symbol(symbol)?;

        let mut parts = chars.as_str().split(',');

        let command: Command = parts
            .next()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::MissingField {
                field: "command",
                line: line.to_string(),
            })?
            .parse()?;

        if command == Command::Error {
            mode = Mode::Error;
        }

        let id = parts.next().ok_or_else(|| Error::MissingField {
            field: "integration id",
            line: line.to_string(),
        })?;
        let integration_id = codec::parse_u32("integration id", id)?;

        let fields = parts.map(|s| s.trim().to_string()).collect();

        Ok(Self {
            mode,
            command,
            integration_id,
            fields,
        })
    }

    /// Decoded error code for `~ERROR` replies
    pub fn error_code(&self) -> Option<ErrorCode> {
        (self.mode == Mode::Error).then(|| ErrorCode::from(self.integration_id))
    }

    /// Shape the remaining fields for an integration's addressing
    pub fn feedback(&self, addressing: Addressing) -> Result<Feedback<'_>> {
        let field = |index: usize, name: &'static str| -> Result<u32> {
            let value = self.fields.get(index).ok_or_else(|| Error::MissingField {
                field: name,
                line: self.to_string(),
            })?;
            codec::parse_u32(name, value)
        };

        match addressing {
            Addressing::Plain => Ok(Feedback::Plain {
                action: field(0, "action")?,
                params: &self.fields[1..],
            }),
            Addressing::Componented => Ok(Feedback::Componented {
                component: field(0, "component")?,
                action: field(1, "action")?,
                params: &self.fields[2..],
            }),
        }
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{},{}", self.mode.symbol(), self.command, self.integration_id)?;
        for field in &self.fields {
            write!(f, ",{field}")?;
        }
        Ok(())
    }
}

/// Feedback shaped for one integration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback<'a> {
    Plain {
        action: u32,
        params: &'a [String],
    },
    Componented {
        component: u32,
        action: u32,
        params: &'a [String],
    },
}

impl<'a> Feedback<'a> {
    pub fn action(&self) -> u32 {
        match *self {
            Self::Plain { action, .. } | Self::Componented { action, .. } => action,
        }
    }

    pub fn component(&self) -> Option<u32> {
        match *self {
            Self::Plain { .. } => None,
            Self::Componented { component, .. } => Some(component),
        }
    }

    pub fn params(&self) -> &'a [String] {
        match *self {
            Self::Plain { params, .. } | Self::Componented { params, .. } => params,
        }
    }

    /// Parameter at `index`, or a malformed-feedback error
    pub fn param(&self, index: usize) -> Result<&'a str> {
        let params = self.params();
        params
            .get(index)
            .map(String::as_str)
            .ok_or(Error::MissingParameter {
                expected: index + 1,
                actual: params.len(),
            })
    }
}
