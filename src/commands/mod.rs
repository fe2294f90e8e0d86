pub mod blpop;
pub mod client;
pub mod command;
pub mod echo;
pub mod executable;
pub mod get;
pub mod llen;
pub mod lpop;
pub mod lpush;
pub mod lrange;
pub mod ping;
pub mod rpush;
pub mod set;

use bytes::Bytes;
use itertools::Itertools;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use blpop::Blpop;
use client::Client;
use command::Command as Command_;
use echo::Echo;
use get::Get;
use llen::Llen;
use lpop::Lpop;
use lpush::Lpush;
use lrange::Lrange;
use ping::Ping;
use rpush::Rpush;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Blpop(Blpop),
    Get(Get),
    Llen(Llen),
    Lpop(Lpop),
    Lpush(Lpush),
    Lrange(Lrange),
    Rpush(Rpush),
    Set(Set),

    Client(Client),
    Command(Command_),
    Echo(Echo),
    Ping(Ping),
}

impl Command {
    /// Runs the command against the store. Only blocking commands actually suspend, the rest
    /// complete without yielding.
    pub async fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Blpop(cmd) => cmd.exec(store).await,
            Command::Client(cmd) => cmd.exec(store),
            Command::Command(cmd) => cmd.exec(store),
            Command::Echo(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Llen(cmd) => cmd.exec(store),
            Command::Lpop(cmd) => cmd.exec(store),
            Command::Lpush(cmd) => cmd.exec(store),
            Command::Lrange(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Rpush(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                }
                .into())
            }
        };

        let mut parts = frames.into_iter();
        let command_name = parse_command_name(parts.next())?;

        let parser = &mut CommandParser {
            command: command_name.clone(),
            parts,
        };

        let command = match &command_name[..] {
            "blpop" => Blpop::try_from(&mut *parser).map(Command::Blpop),
            "client" => Client::try_from(&mut *parser).map(Command::Client),
            "command" => Command_::try_from(&mut *parser).map(Command::Command),
            "echo" => Echo::try_from(&mut *parser).map(Command::Echo),
            "get" => Get::try_from(&mut *parser).map(Command::Get),
            "llen" => Llen::try_from(&mut *parser).map(Command::Llen),
            "lpop" => Lpop::try_from(&mut *parser).map(Command::Lpop),
            "lpush" => Lpush::try_from(&mut *parser).map(Command::Lpush),
            "lrange" => Lrange::try_from(&mut *parser).map(Command::Lrange),
            "ping" => Ping::try_from(&mut *parser).map(Command::Ping),
            "rpush" => Rpush::try_from(&mut *parser).map(Command::Rpush),
            "set" => Set::try_from(&mut *parser).map(Command::Set),
            _ => {
                return Err(CommandParserError::UnknownCommand {
                    command: command_name,
                    args: parser.describe_remaining(),
                }
                .into())
            }
        }?;

        parser.finish()?;

        Ok(command)
    }
}

fn parse_command_name(frame: Option<Frame>) -> Result<String, CommandParserError> {
    match frame {
        // Command names are case insensitive.
        Some(Frame::Simple(s)) => Ok(s.to_lowercase()),
        Some(Frame::Bulk(bytes)) => str::from_utf8(&bytes[..])
            .map(|s| s.to_lowercase())
            .map_err(CommandParserError::InvalidUTF8String),
        Some(frame) => Err(CommandParserError::InvalidFrame {
            expected: "simple string".to_string(),
            actual: frame,
        }),
        None => Err(CommandParserError::InvalidFrame {
            expected: "command name".to_string(),
            actual: Frame::Array(vec![]),
        }),
    }
}

/// Pulls the arguments of a command out of its request frame, one at a time.
pub struct CommandParser {
    command: String,
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn next_frame(&mut self) -> Result<Frame, CommandParserError> {
        self.parts
            .next()
            .ok_or_else(|| CommandParserError::WrongNumberOfArguments {
                command: self.command.clone(),
            })
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        match self.next_frame()? {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        match self.next_frame()? {
            Frame::Integer(i) => Ok(i),
            Frame::Simple(string) => string
                .parse::<i64>()
                .map_err(|_| CommandParserError::NotAnInteger),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map_err(|_| CommandParserError::NotAnInteger)?
                .parse::<i64>()
                .map_err(|_| CommandParserError::NotAnInteger),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "integer".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_float(&mut self) -> Result<f64, CommandParserError> {
        let value = match self.next_frame()? {
            Frame::Integer(i) => return Ok(i as f64),
            Frame::Simple(string) => string.parse::<f64>().ok(),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .ok()
                .and_then(|s| s.parse::<f64>().ok()),
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "float".to_string(),
                    actual: frame,
                })
            }
        };

        value
            .filter(|value| value.is_finite())
            .ok_or(CommandParserError::NotAFloat)
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        match self.next_frame()? {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Takes every argument left, requiring at least one.
    fn remaining_bytes(&mut self) -> Result<Vec<Bytes>, CommandParserError> {
        let mut values = vec![self.next_bytes()?];
        while self.has_remaining() {
            values.push(self.next_bytes()?);
        }
        Ok(values)
    }

    fn has_remaining(&self) -> bool {
        self.parts.len() > 0
    }

    /// Fails if the command was given more arguments than it takes.
    fn finish(&self) -> Result<(), CommandParserError> {
        if self.has_remaining() {
            return Err(CommandParserError::WrongNumberOfArguments {
                command: self.command.clone(),
            });
        }
        Ok(())
    }

    fn describe_remaining(&self) -> String {
        self.parts
            .as_slice()
            .iter()
            .map(|frame| match frame {
                Frame::Bulk(bytes) => format!("'{}'", String::from_utf8_lossy(bytes)),
                frame => format!("'{}'", frame),
            })
            .join(" ")
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR Protocol error: invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR unknown command '{command}', with args beginning with: {args}")]
    UnknownCommand { command: String, args: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongNumberOfArguments { command: String },
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR value is not a valid float")]
    NotAFloat,
    #[error("ERR {0}")]
    InvalidArgument(String),
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR Protocol error: invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
}
