use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Removes and returns the first elements of the list stored at `key`.
///
/// Without `count` the reply is a single bulk string. With `count` up to that many elements are
/// returned as an array. A missing list replies with `nil` in both forms.
///
/// Ref: <https://redis.io/docs/latest/commands/lpop/>
#[derive(Debug, PartialEq)]
pub struct Lpop {
    pub key: String,
    pub count: Option<usize>,
}

impl Executable for Lpop {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut lists = store.lists();

        if lists.len(&self.key) == 0 {
            return Ok(Frame::Null);
        }

        let res = match self.count {
            Some(count) => {
                let popped = lists.pop_front(&self.key, count);
                Frame::Array(popped.into_iter().map(Frame::Bulk).collect())
            }
            None => lists
                .pop_front(&self.key, 1)
                .pop()
                .map_or(Frame::Null, Frame::Bulk),
        };

        Ok(res)
    }
}

impl TryFrom<&mut CommandParser> for Lpop {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;

        let count = if parser.has_remaining() {
            let count = parser.next_integer()?;
            let count = usize::try_from(count).map_err(|_| {
                CommandParserError::InvalidArgument(
                    "value is out of range, must be positive".to_string(),
                )
            })?;
            Some(count)
        } else {
            None
        };

        Ok(Self { key, count })
    }
}
