/*
 * Copyright (c) 2026 eps-integration-core authors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *    http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::trace;
use serde_json::Value;
use tokio::{spawn, sync::RwLock, time::sleep};

use crate::misc::Clock;

/// Time-bounded memoization of registry responses, keyed by request
/// signature. Lookups never error; an expired entry is simply a miss.
/// Entries expire passively on read and are swept periodically.
pub struct ResponseCache {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    payload: Value,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn expired_at(&self, now: DateTime<Utc>) -> bool {
        match ChronoDuration::from_std(self.ttl) {
            Ok(ttl) => self.inserted_at + ttl <= now,
            Err(_) => false,
        }
    }
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if entry.expired_at(now) {
            return None;
        }

        Some(entry.payload.clone())
    }

    pub async fn set(&self, key: &str, payload: Value, ttl: Duration) {
        let entry = CacheEntry {
            payload,
            inserted_at: self.clock.now(),
            ttl,
        };

        self.entries.write().await.insert(key.to_owned(), entry);
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
    }

    /// Removes expired entries, returns how many went.
    pub async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();

        entries.retain(|_, entry| !entry.expired_at(now));

        before - entries.len()
    }
}

/// Background sweep so expired entries do not pile up between reads.
pub fn spawn_sweeper(cache: Arc<ResponseCache>, interval: Duration) {
    spawn(async move {
        loop {
            sleep(interval).await;

            let removed = cache.sweep().await;
            if removed > 0 {
                trace!("response cache sweep removed {} entries", removed);
            }
        }
    });
}
