use bytes::Bytes;
use tokio::time::Duration;

use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Removes and returns the first element of the list stored at `key`. When the list is empty the
/// client blocks until another client pushes to it, or until `timeout` seconds elapse. A timeout
/// of zero blocks indefinitely.
///
/// Replies with a two element array holding the key and the popped element, or `nil` when the
/// timeout is reached.
///
/// Ref: <https://redis.io/docs/latest/commands/blpop/>
#[derive(Debug, PartialEq)]
pub struct Blpop {
    pub key: String,
    pub timeout: Option<Duration>,
}

impl Blpop {
    pub async fn exec(self, store: Store) -> Result<Frame, Error> {
        let value = store.blpop(&self.key, self.timeout).await;

        let res = match value {
            Some(value) => Frame::Array(vec![
                Frame::Bulk(Bytes::from(self.key)),
                Frame::Bulk(value),
            ]),
            None => Frame::Null,
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Blpop {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;

        let seconds = parser.next_float().map_err(|err| match err {
            CommandParserError::NotAFloat => CommandParserError::InvalidArgument(
                "timeout is not a float or out of range".to_string(),
            ),
            err => err,
        })?;

        if seconds < 0.0 {
            return Err(
                CommandParserError::InvalidArgument("timeout is negative".to_string()).into(),
            );
        }

        let timeout = if seconds == 0.0 {
            None
        } else {
            let timeout = Duration::try_from_secs_f64(seconds).map_err(|_| {
                CommandParserError::InvalidArgument(
                    "timeout is not a float or out of range".to_string(),
                )
            })?;
            Some(timeout)
        };

        Ok(Self { key, timeout })
    }
}
