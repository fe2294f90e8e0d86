use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Clients like `redis-cli` send `COMMAND DOCS` when they connect. No command documentation is
/// exposed, the reply is always empty.
///
/// Ref: <https://redis.io/docs/latest/commands/command>
#[derive(Debug, PartialEq)]
pub struct Command {}

impl Executable for Command {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Ok(Frame::Array(vec![]))
    }
}

impl TryFrom<&mut CommandParser> for Command {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        // Subcommands and their arguments are accepted and ignored.
        while parser.has_remaining() {
            parser.next_frame()?;
        }

        Ok(Self {})
    }
}
