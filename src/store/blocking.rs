//! Coordination between clients blocked popping from a list and the clients pushing to it.
//!
//! Every blocked client owns a waiter: a one-shot slot queued under the key it waits on. A push
//! hands the head of the list to the oldest waiter of that key, at most one waiter per push. A
//! waiter ends up either fulfilled, when a producer wrote to its slot, or timed out, when its
//! client deregistered it first. Both happen under the lists lock, so exactly one of them wins.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio::time::{self, Duration};
use tracing::debug;

use crate::store::lists::Pop;
use crate::store::Store;

pub type WaiterId = u64;

struct Waiter {
    id: WaiterId,
    slot: oneshot::Sender<Bytes>,
}

/// Per key FIFO queues of blocked clients.
#[derive(Default)]
pub struct WaitQueues {
    queues: HashMap<String, VecDeque<Waiter>>,
    next_id: WaiterId,
}

impl WaitQueues {
    /// Queues a new waiter behind every client already blocked on `key`.
    pub fn register(&mut self, key: &str) -> (WaiterId, oneshot::Receiver<Bytes>) {
        let (slot, receiver) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;

        self.queues
            .entry(key.to_string())
            .or_default()
            .push_back(Waiter { id, slot });

        (id, receiver)
    }

    /// Removes the waiter from its queue. Removing a waiter that isn't queued anymore is a
    /// no-op and returns false.
    pub fn cancel(&mut self, key: &str, id: WaiterId) -> bool {
        let Some(queue) = self.queues.get_mut(key) else {
            return false;
        };

        let before = queue.len();
        queue.retain(|waiter| waiter.id != id);
        let removed = queue.len() < before;

        if queue.is_empty() {
            self.queues.remove(key);
        }
        removed
    }

    pub fn len(&self, key: &str) -> usize {
        self.queues.get(key).map_or(0, VecDeque::len)
    }

    /// Moves the head of `list` into the slot of the oldest waiter on `key`.
    ///
    /// A waiter whose client is gone can't take the element; it's put back at the head of the
    /// list and the next oldest waiter is tried. Returns the waiter that was served, if any.
    pub fn hand_off(&mut self, key: &str, list: &mut VecDeque<Bytes>) -> Option<WaiterId> {
        let queue = self.queues.get_mut(key)?;

        let mut served = None;
        while served.is_none() {
            let Some(value) = list.pop_front() else {
                break;
            };
            let Some(waiter) = queue.pop_front() else {
                list.push_front(value);
                break;
            };

            match waiter.slot.send(value) {
                Ok(()) => served = Some(waiter.id),
                Err(value) => {
                    debug!(key, waiter = waiter.id, "Skipping waiter of a closed client");
                    list.push_front(value);
                }
            }
        }

        if queue.is_empty() {
            self.queues.remove(key);
        }
        served
    }
}

/// Deregisters a waiter when its client stops waiting, whether it timed out or its connection
/// was dropped while blocked.
struct WaitGuard<'a> {
    store: &'a Store,
    key: &'a str,
    id: WaiterId,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.store.lists().cancel_wait(self.key, self.id) {
            debug!(key = self.key, waiter = self.id, "Blocked client stopped waiting");
        }
    }
}

impl Store {
    /// Pops the head of the list stored at `key`, waiting for a producer to push one when the
    /// list is empty. Without a timeout it waits indefinitely. Returns `None` when the timeout
    /// elapses first.
    pub async fn blpop(&self, key: &str, timeout: Option<Duration>) -> Option<Bytes> {
        let pop = self.lists().pop_or_wait(key);
        let (id, mut slot) = match pop {
            Pop::Ready(value) => return Some(value),
            Pop::Blocked { id, slot } => (id, slot),
        };

        let guard = WaitGuard {
            store: self,
            key,
            id,
        };

        let received = match timeout {
            Some(timeout) => time::timeout(timeout, &mut slot)
                .await
                .ok()
                .and_then(Result::ok),
            None => (&mut slot).await.ok(),
        };

        // Once the waiter is out of the queue no producer can reach it. If a producer served it
        // after the timeout fired but before it was removed, the value is already in the slot.
        drop(guard);

        received.or_else(|| slot.try_recv().ok())
    }
}
