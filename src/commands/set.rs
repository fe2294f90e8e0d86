use bytes::Bytes;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use strum_macros::EnumString;
use tokio::time::{Duration, Instant};

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set `key` to hold the string `value`. If key already holds a value, it is overwritten, and any
/// previous time to live associated with the key is discarded.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Ttl>,
}

#[derive(Debug, PartialEq)]
pub enum Ttl {
    Ex(u64),
    Px(u64),
}

impl Ttl {
    pub fn duration(&self) -> Duration {
        match self {
            Ttl::Ex(seconds) => Duration::from_secs(*seconds),
            Ttl::Px(millis) => Duration::from_millis(*millis),
        }
    }

    /// Expirations are bounded like absolute unix timestamps in milliseconds: the deadline has
    /// to fit in an `i64`.
    fn in_range(&self) -> bool {
        let millis = match self {
            Ttl::Ex(seconds) => seconds.checked_mul(1000),
            Ttl::Px(millis) => Some(*millis),
        };
        let Some(millis) = millis else {
            return false;
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |since_epoch| since_epoch.as_millis());

        now + u128::from(millis) <= i64::MAX as u128
            && Instant::now().checked_add(self.duration()).is_some()
    }
}

#[derive(Debug, EnumString)]
#[strum(ascii_case_insensitive)]
enum SetOption {
    Ex,
    Px,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let mut store = store.strings();

        match self.ttl {
            Some(ttl) => store.set_with_ttl(self.key, self.value, ttl.duration()),
            None => store.set(self.key, self.value),
        }

        Ok(Frame::Simple("OK".to_string()))
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut ttl = None;

        while parser.has_remaining() {
            let option = parser.next_string()?;
            let option = SetOption::from_str(&option).map_err(|_| CommandParserError::SyntaxError)?;

            // Only one expiration may be given, and it needs a value.
            if ttl.is_some() || !parser.has_remaining() {
                return Err(CommandParserError::SyntaxError.into());
            }

            let val = parser.next_integer()?;
            let invalid_expire_time = || {
                CommandParserError::InvalidArgument(
                    "invalid expire time in 'set' command".to_string(),
                )
            };
            let val = u64::try_from(val)
                .ok()
                .filter(|val| *val > 0)
                .ok_or_else(invalid_expire_time)?;

            let option_ttl = match option {
                SetOption::Ex => Ttl::Ex(val),
                SetOption::Px => Ttl::Px(val),
            };
            if !option_ttl.in_range() {
                return Err(invalid_expire_time().into());
            }
            ttl = Some(option_ttl);
        }

        Ok(Self { key, value, ttl })
    }
}
