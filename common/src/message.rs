use core::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A parsed request line.
///
/// Only the verb is matched case-insensitively; keys, values and channel
/// names are kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SET { key: String, value: String },

    GET { key: String },

    DEL { key: String },

    CREATECHAN { name: String },

    CLOSECHAN { name: String },

    SETTOCHAN {
        name: String,
        key: String,
        value: String,
    },

    READFROMCHAN { name: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("empty command")]
    MissingCommand,
    #[error("unknown command")]
    UnknownCommand,
    #[error("wrong number of arguments")]
    WrongArity,
}

impl Command {
    /// Parses one request line.
    ///
    /// Tokens are separated by single spaces, so a doubled space yields an
    /// empty token that still counts toward the argument total.
    pub fn try_new(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandParseError::MissingCommand);
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        let (verb, args) = tokens
            .split_first()
            .ok_or(CommandParseError::MissingCommand)?;

        match verb.to_uppercase().as_str() {
            "SET" => match args {
                [key, value] => Ok(Self::SET {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "GET" => match args {
                [key] => Ok(Self::GET {
                    key: key.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "DEL" => match args {
                [key] => Ok(Self::DEL {
                    key: key.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "CREATECHAN" => match args {
                [name] => Ok(Self::CREATECHAN {
                    name: name.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "CLOSECHAN" => match args {
                [name] => Ok(Self::CLOSECHAN {
                    name: name.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "SETTOCHAN" => match args {
                [name, key, value] => Ok(Self::SETTOCHAN {
                    name: name.to_string(),
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            "READFROMCHAN" => match args {
                [name] => Ok(Self::READFROMCHAN {
                    name: name.to_string(),
                }),
                _ => Err(CommandParseError::WrongArity),
            },
            _ => Err(CommandParseError::UnknownCommand),
        }
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::try_new(s)
    }
}

/// A reply line. `Display` renders the exact text written to the socket,
/// without the trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    OK,

    VALUE(String),

    NULL,

    RECORD { key: String, value: String },

    ERROR(String),
}

impl From<CommandParseError> for Response {
    fn from(err: CommandParseError) -> Self {
        Response::ERROR(err.to_string())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::OK => write!(f, "OK"),
            Response::VALUE(value) => write!(f, "{}", value),
            Response::NULL => write!(f, "(nil)"),
            Response::RECORD { key, value } => write!(f, "{} {}", key, value),
            Response::ERROR(message) => write!(f, "ERR {}", message),
        }
    }
}
