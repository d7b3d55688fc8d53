pub mod config;
pub mod echo;
pub mod executable;
pub mod get;
pub mod ping;
pub mod set;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

use config::Config;
use echo::Echo;
use get::Get;
use ping::Ping;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Config(Config),
    Echo(Echo),
    Get(Get),
    Ping(Ping),
    Set(Set),
}

impl Executable for Command {
    fn exec(self, store: &Store, params: &ConfigStore) -> Frame {
        match self {
            Command::Config(cmd) => cmd.exec(store, params),
            Command::Echo(cmd) => cmd.exec(store, params),
            Command::Get(cmd) => cmd.exec(store, params),
            Command::Ping(cmd) => cmd.exec(store, params),
            Command::Set(cmd) => cmd.exec(store, params),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let parser = &mut CommandParser {
            command: String::new(),
            parts: frames.into_iter(),
        };

        let command_name = parser.parse_command_name()?;

        match &command_name[..] {
            "config" => Config::try_from(parser).map(Command::Config),
            "echo" => Echo::try_from(parser).map(Command::Echo),
            "get" => Get::try_from(parser).map(Command::Get),
            "ping" => Ping::try_from(parser).map(Command::Ping),
            "set" => Set::try_from(parser).map(Command::Set),
            _ => Err(CommandParserError::UnknownCommand {
                command: command_name,
            }),
        }
    }
}

/// Walks the arguments of a single command, in order.
pub struct CommandParser {
    /// Lowercased command name, kept for error reporting.
    command: String,
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        // A name that isn't UTF-8 can't match any command, so it is just another unknown one.
        let command_name = match self.parts.next() {
            Some(Frame::Bulk(bytes)) => String::from_utf8_lossy(&bytes).to_lowercase(),
            Some(frame) => Self::frame_to_string(frame)?.to_lowercase(),
            None => {
                return Err(CommandParserError::UnknownCommand {
                    command: String::new(),
                })
            }
        };

        self.command.clone_from(&command_name);
        Ok(command_name)
    }

    fn next_frame(&mut self) -> Result<Frame, CommandParserError> {
        self.parts
            .next()
            .ok_or_else(|| CommandParserError::WrongNumberOfArguments {
                command: self.command.clone(),
            })
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        let frame = self.next_frame()?;
        Self::frame_to_string(frame)
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        match self.next_frame()? {
            Frame::Bulk(bytes) => Ok(bytes),
            Frame::Simple(s) => Ok(Bytes::from(s)),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Number of arguments not consumed yet.
    fn remaining(&self) -> usize {
        self.parts.len()
    }

    /// Fails if any argument was left unconsumed.
    fn finish(&self) -> Result<(), CommandParserError> {
        if self.remaining() > 0 {
            return Err(CommandParserError::WrongNumberOfArguments {
                command: self.command.clone(),
            });
        }
        Ok(())
    }

    fn frame_to_string(frame: Frame) -> Result<String, CommandParserError> {
        match frame {
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            Frame::Simple(s) => Ok(s),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "bulk string".to_string(),
                actual: frame,
            }),
        }
    }
}

/// Errors raised while turning a frame into a [`Command`]. They are reported back to the client
/// as error replies, and the connection stays open.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR unknown command")]
    UnknownCommand { command: String },
    /// A known command called with arguments it does not understand, such as a malformed `SET`
    /// expiration. Redis clients see it the same way as an unknown command.
    #[error("ERR unknown command")]
    InvalidCommandArgument { command: String, argument: String },
    #[error("ERR wrong number of arguments")]
    WrongNumberOfArguments { command: String },
    #[error("ERR invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
}

impl From<CommandParserError> for Frame {
    fn from(err: CommandParserError) -> Self {
        Frame::Error(err.to_string())
    }
}

#[cfg(test)]
pub(crate) fn command_frame(parts: &[&str]) -> Frame {
    Frame::Array(
        parts
            .iter()
            .map(|part| Frame::Bulk(Bytes::copy_from_slice(part.as_bytes())))
            .collect(),
    )
}
