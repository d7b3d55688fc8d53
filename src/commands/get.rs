use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

/// Get the value of `key`. If the key does not exist, or has expired, the special value `nil` is
/// returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    fn exec(self, store: &Store, _params: &ConfigStore) -> Frame {
        match store.lock().get(&self.key) {
            Some(value) => Frame::Bulk(value),
            None => Frame::Null,
        }
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        parser.finish()?;

        Ok(Self { key })
    }
}
