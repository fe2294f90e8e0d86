use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Commands that run to completion without waiting on other clients.
pub trait Executable {
    fn exec(self, store: Store) -> Result<Frame, Error>;
}
