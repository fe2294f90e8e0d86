use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::lists::End;
use crate::store::Store;
use crate::Error;

/// Insert all the specified values at the head of the list stored at `key`. Elements are inserted
/// one after the other, so `LPUSH mylist a b c` results in a list containing `c` as first
/// element, `b` as second element and `a` as third element.
///
/// Like RPUSH, the push hands the head of the list to the oldest client blocked on `key`.
///
/// Ref: <https://redis.io/docs/latest/commands/lpush/>
#[derive(Debug, PartialEq)]
pub struct Lpush {
    pub key: String,
    pub values: Vec<Bytes>,
}

impl Executable for Lpush {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let len = store.lists().push(&self.key, self.values, End::Front);

        Ok(Frame::Integer(len as i64))
    }
}

impl TryFrom<&mut CommandParser> for Lpush {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let values = parser.remaining_bytes()?;

        Ok(Self { key, values })
    }
}
