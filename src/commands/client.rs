use std::str::FromStr;
use strum_macros::EnumString;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Connection management. Client libraries name themselves with `CLIENT SETNAME` and
/// `CLIENT SETINFO` right after connecting; both are acknowledged and otherwise ignored.
///
/// Ref: <https://redis.io/docs/latest/commands/client-setinfo/>
#[derive(Debug, PartialEq)]
pub struct Client {
    pub subcommand: Subcommand,
}

#[derive(Debug, PartialEq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Subcommand {
    Setinfo,
    Setname,
}

impl Executable for Client {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Client {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let name = parser.next_string()?;
        let subcommand = Subcommand::from_str(&name).map_err(|_| {
            CommandParserError::InvalidArgument(format!(
                "unknown subcommand '{}'. Try CLIENT HELP.",
                name
            ))
        })?;

        let arity = match subcommand {
            Subcommand::Setinfo => 2,
            Subcommand::Setname => 1,
        };
        for _ in 0..arity {
            parser.next_string()?;
        }

        Ok(Self { subcommand })
    }
}
