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

use std::time::Duration;

use rand::Rng;

/// Retry behaviour of the registry client: how many extra attempts a
/// retryable failure gets and how the inter-attempt delay grows.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Rate limiting and upstream unavailability are worth another try,
    /// everything else is terminal.
    pub fn is_retryable(status: u16) -> bool {
        matches!(status, 429 | 503 | 504)
    }

    /// Delay before retry number `attempt` (counting from zero):
    /// `2^attempt * base + jitter`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay.as_millis() as u64 * (1u64 << attempt.min(MAX_SHIFT));
        let jitter = rng.gen_range(0..self.max_jitter.as_millis().max(1) as u64);

        Duration::from_millis(base + jitter)
    }
}

// caps the exponent so the shift cannot overflow
const MAX_SHIFT: u32 = 16;
