use bytes::Bytes;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

/// Set `key` to hold the string `value`, optionally expiring after `PX milliseconds`. If key
/// already holds a value, it is overwritten along with its expiration.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    /// `None`, or a zero duration, keeps the key forever.
    pub ttl: Option<Duration>,
}

impl Executable for Set {
    fn exec(self, store: &Store, _params: &ConfigStore) -> Frame {
        store.lock().set(self.key, self.value, self.ttl);

        Frame::Simple("OK".to_string())
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        // Every malformed form of SET, wrong arity included, is reported as an unknown command.
        let invalid = |argument: String| CommandParserError::InvalidCommandArgument {
            command: "set".to_string(),
            argument,
        };

        if parser.remaining() != 2 && parser.remaining() != 4 {
            return Err(invalid(format!("{} arguments", parser.remaining())));
        }

        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let ttl = if parser.remaining() == 2 {
            let option = parser.next_string()?;
            if !option.eq_ignore_ascii_case("px") {
                return Err(invalid(option));
            }

            let millis = parser.next_string()?;
            let millis = millis.parse::<u64>().map_err(|_| invalid(millis))?;

            Some(Duration::from_millis(millis))
        } else {
            None
        };

        Ok(Self { key, value, ttl })
    }
}
