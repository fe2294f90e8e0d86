use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tracing::debug;

use crate::store::blocking::{WaitQueues, WaiterId};

type Key = String;

/// The end of a list elements are pushed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum End {
    Front,
    Back,
}

/// Outcome of a blocking pop attempt, see [`Lists::pop_or_wait`].
pub enum Pop {
    Ready(Bytes),
    Blocked {
        id: WaiterId,
        slot: oneshot::Receiver<Bytes>,
    },
}

/// Lists and the clients blocked waiting for them. Both live behind the same lock, see
/// [`crate::store::Store`].
///
/// A list is dropped as soon as it becomes empty, so a missing key and an empty list are
/// indistinguishable.
#[derive(Default)]
pub struct Lists {
    lists: HashMap<Key, VecDeque<Bytes>>,
    waiters: WaitQueues,
}

impl Lists {
    /// Pushes `values` one at a time to the given end of the list, then hands the head of the
    /// list to the oldest client blocked on `key`, if any. Returns the length of the list once
    /// the hand-off is done.
    pub fn push(&mut self, key: &str, values: Vec<Bytes>, end: End) -> usize {
        let list = self.lists.entry(key.to_string()).or_default();
        for value in values {
            match end {
                End::Front => list.push_front(value),
                End::Back => list.push_back(value),
            }
        }

        if let Some(id) = self.waiters.hand_off(key, list) {
            debug!(key, waiter = id, "Handed off list head to blocked client");
        }

        let len = list.len();
        if len == 0 {
            self.lists.remove(key);
        }
        len
    }

    pub fn len(&self, key: &str) -> usize {
        self.lists.get(key).map_or(0, VecDeque::len)
    }

    /// Elements between `start` and `end`, both inclusive. Negative indexes count from the end
    /// of the list; indexes that are still negative are clamped to the first element and `end`
    /// is clamped to the last one.
    pub fn range(&self, key: &str, start: i64, end: i64) -> Vec<Bytes> {
        let Some(list) = self.lists.get(key) else {
            return vec![];
        };

        let len = list.len() as i64;
        let start = normalize_index(len, start);
        let end = normalize_index(len, end).min(len - 1);

        if start > end {
            return vec![];
        }

        list.range(start as usize..=end as usize).cloned().collect()
    }

    /// Removes up to `count` elements from the head of the list. Blocked clients are not
    /// involved, only pushes wake them up.
    pub fn pop_front(&mut self, key: &str, count: usize) -> Vec<Bytes> {
        let Some(list) = self.lists.get_mut(key) else {
            return vec![];
        };

        let count = count.min(list.len());
        let popped = list.drain(..count).collect();

        if list.is_empty() {
            self.lists.remove(key);
        }
        popped
    }

    /// Pops the head of the list or, when there's nothing to pop, registers the caller at the
    /// back of the queue of clients blocked on `key`.
    pub fn pop_or_wait(&mut self, key: &str) -> Pop {
        if let Some(value) = self.pop_front(key, 1).pop() {
            return Pop::Ready(value);
        }

        let (id, slot) = self.waiters.register(key);
        debug!(key, waiter = id, "Client blocked waiting for list");

        Pop::Blocked { id, slot }
    }

    /// Removes a blocked client from the queue of `key`. Returns false when it's no longer
    /// there, because it was already served or cancelled.
    pub fn cancel_wait(&mut self, key: &str, id: WaiterId) -> bool {
        self.waiters.cancel(key, id)
    }

    /// Number of clients blocked on `key`.
    pub fn waiting(&self, key: &str) -> usize {
        self.waiters.len(key)
    }
}

fn normalize_index(len: i64, index: i64) -> i64 {
    if index < 0 {
        (len + index).max(0)
    } else {
        index
    }
}
