use bytes::Bytes;
use std::collections::HashMap;
use tokio::time::{Duration, Instant};

type Key = String;

pub struct Value {
    pub data: Bytes,
    pub expires_at: Option<Instant>,
}

impl Value {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Scalar values. Expiration is lazy: there's no background task, an expired key is removed the
/// next time it's read.
#[derive(Default)]
pub struct Strings {
    keys: HashMap<Key, Value>,
}

impl Strings {
    /// Stores `data` under `key`, replacing any previous value and its expiration.
    pub fn set(&mut self, key: Key, data: Bytes) {
        let value = Value {
            data,
            expires_at: None,
        };
        self.keys.insert(key, value);
    }

    /// Stores `data` under `key`, expiring after `ttl`. A deadline too far away to be represented
    /// never expires.
    pub fn set_with_ttl(&mut self, key: Key, data: Bytes, ttl: Duration) {
        let value = Value {
            data,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.keys.insert(key, value);
    }

    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        let expired = self.keys.get(key)?.is_expired(Instant::now());
        if expired {
            self.keys.remove(key);
            return None;
        }

        self.keys.get(key).map(|value| value.data.clone())
    }

    /// Number of stored keys, including expired ones that were not read yet.
    pub fn size(&self) -> usize {
        self.keys.len()
    }
}
