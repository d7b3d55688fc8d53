use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

/// Returns PONG. Any arguments are ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping;

impl Executable for Ping {
    fn exec(self, _store: &Store, _params: &ConfigStore) -> Frame {
        Frame::Simple("PONG".to_string())
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandParserError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{command_frame, Command};

    #[test]
    fn pong() {
        let cmd = Command::try_from(command_frame(&["PING"])).unwrap();
        assert_eq!(cmd, Command::Ping(Ping));

        let res = cmd.exec(&Store::new(), &ConfigStore::default());

        assert_eq!(res, Frame::Simple("PONG".to_string()));
    }

    #[test]
    fn arguments_are_ignored() {
        let cmd = Command::try_from(command_frame(&["ping", "hello", "world"])).unwrap();

        let res = cmd.exec(&Store::new(), &ConfigStore::default());

        assert_eq!(res, Frame::Simple("PONG".to_string()));
    }
}
