pub mod blocking;
pub mod lists;
pub mod strings;

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lists::Lists;
use strings::Strings;

/// The Store holds every key the server knows about: scalar values with optional expiration and
/// lists together with the clients blocked on them. It is shared by all connections and is
/// cheap to clone, the state lives behind reference counting.
///
/// Strings and lists are guarded by separate locks. The lists lock also guards the queues of
/// blocked clients, so that checking a list for elements and registering as a waiter, or pushing
/// an element and handing it to a waiter, happen atomically.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        let inner = Arc::new(InnerStore {
            strings: Mutex::new(Strings::default()),
            lists: Mutex::new(Lists::default()),
        });

        Self { inner }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerStore {
    strings: Mutex<Strings>,
    lists: Mutex<Lists>,
}

impl InnerStore {
    pub fn strings(&self) -> MutexGuard<'_, Strings> {
        // The guarded maps are left consistent between statements, a panic elsewhere while
        // holding the lock doesn't invalidate them.
        self.strings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lists(&self) -> MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
