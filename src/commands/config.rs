use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

/// Read a configuration parameter. Only the `GET` subcommand is supported, with a single exact
/// parameter name (no glob patterns).
///
/// Ref: <https://redis.io/docs/latest/commands/config-get/>
#[derive(Debug, PartialEq)]
pub struct Config {
    pub parameter: String,
}

impl Executable for Config {
    fn exec(self, _store: &Store, params: &ConfigStore) -> Frame {
        let value = params.get(&self.parameter).unwrap_or_default();
        let value = Frame::Bulk(Bytes::copy_from_slice(value.as_bytes()));

        Frame::Array(vec![Frame::Bulk(Bytes::from(self.parameter)), value])
    }
}

impl TryFrom<&mut CommandParser> for Config {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        // A bare `CONFIG` is treated like any other unsupported subcommand.
        let subcommand = if parser.remaining() > 0 {
            parser.next_string()?
        } else {
            String::new()
        };
        if !subcommand.eq_ignore_ascii_case("get") {
            return Err(CommandParserError::InvalidCommandArgument {
                command: "config".to_string(),
                argument: subcommand,
            });
        }

        let parameter = parser.next_string()?;
        parser.finish()?;

        Ok(Self { parameter })
    }
}
