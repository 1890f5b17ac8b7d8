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

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::misc::Clock;

use super::error::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// The credential exchange itself (client id/secret for a bearer token).
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, client_id: &str, client_secret: &str)
        -> Result<TokenResponse, Error>;
}

/// Caches the registry bearer token and refreshes it shortly before it
/// expires. The cache mutex is held across the exchange on purpose: it is
/// the single-flight guard, so concurrent callers hitting an expired token
/// trigger exactly one exchange and all wait for its outcome.
pub struct TokenManager {
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl TokenManager {
    pub fn new(
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn Clock>,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            exchange,
            clock,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;
        let now = self.clock.now();

        if let Some(current) = &*cached {
            if current.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(current.token.clone());
            }
        }

        let response = self
            .exchange
            .exchange(&self.client_id, &self.client_secret)
            .await?;
        let expires_at = now + Duration::seconds(response.expires_in as i64);

        debug!("registry token refreshed, valid until {}", expires_at);

        *cached = Some(CachedToken {
            token: response.access_token.clone(),
            expires_at,
        });

        Ok(response.access_token)
    }

    /// Drops the cached token, e.g. after the registry rejected it.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

pub struct HttpTokenExchange {
    client: HttpClient,
    token_url: Url,
}

impl HttpTokenExchange {
    pub fn new(client: HttpClient, token_url: Url) -> Self {
        Self { client, token_url }
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse, Error> {
        let res = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|err| Error::Authentication(err.to_string()))?;

        if !res.status().is_success() {
            return Err(Error::Authentication(format!(
                "credential exchange failed with status {}",
                res.status()
            )));
        }

        res.json::<TokenResponse>()
            .await
            .map_err(|err| Error::Authentication(err.to_string()))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use chrono::TimeZone;
    use tokio::time::sleep;

    use crate::misc::test_support::ManualClock;

    struct CountingExchange {
        calls: AtomicUsize,
        delay: StdDuration,
        fail: bool,
    }

    impl CountingExchange {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: StdDuration::from_millis(0),
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(
            &self,
            _client_id: &str,
            _client_secret: &str,
        ) -> Result<TokenResponse, Error> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }

            if self.fail {
                return Err(Error::Authentication("exchange refused".into()));
            }

            Ok(TokenResponse {
                access_token: format!("token-{}", call),
                expires_in: 3600,
            })
        }
    }

    fn manager(
        exchange: Arc<CountingExchange>,
        clock: Arc<ManualClock>,
    ) -> TokenManager {
        TokenManager::new(exchange, clock, "pharmacy-app".into(), "s3cr3t".into())
    }

    fn start() -> DateTime<Utc> {
        Utc.ymd(2026, 3, 1).and_hms(8, 0, 0)
    }

    #[tokio::test]
    async fn token_is_cached_until_safety_margin() {
        let exchange = Arc::new(CountingExchange::new());
        let clock = Arc::new(ManualClock::new(start()));
        let manager = manager(exchange.clone(), clock.clone());

        assert_eq!(manager.get_token().await.unwrap(), "token-1");

        // 50 minutes in: still 10 minutes of validity, margin not reached
        clock.advance(Duration::minutes(50));
        assert_eq!(manager.get_token().await.unwrap(), "token-1");

        // 55 minutes in: within the 5 minute margin, refresh
        clock.advance(Duration::minutes(5));
        assert_eq!(manager.get_token().await.unwrap(), "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_exchange() {
        let exchange = Arc::new(CountingExchange {
            calls: AtomicUsize::new(0),
            delay: StdDuration::from_millis(20),
            fail: false,
        });
        let clock = Arc::new(ManualClock::new(start()));
        let manager = Arc::new(manager(exchange.clone(), clock));

        let (a, b) = tokio::join!(manager.get_token(), manager.get_token());

        assert_eq!(a.unwrap(), "token-1");
        assert_eq!(b.unwrap(), "token-1");
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn failed_exchange_surfaces_and_is_not_cached() {
        let exchange = Arc::new(CountingExchange {
            calls: AtomicUsize::new(0),
            delay: StdDuration::from_millis(0),
            fail: true,
        });
        let clock = Arc::new(ManualClock::new(start()));
        let manager = manager(exchange.clone(), clock);

        assert!(matches!(
            manager.get_token().await,
            Err(Error::Authentication(_))
        ));

        // a second call exchanges again instead of serving a stale failure
        let _ = manager.get_token().await;
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_exchange() {
        let exchange = Arc::new(CountingExchange::new());
        let clock = Arc::new(ManualClock::new(start()));
        let manager = manager(exchange.clone(), clock);

        assert_eq!(manager.get_token().await.unwrap(), "token-1");
        manager.invalidate().await;
        assert_eq!(manager.get_token().await.unwrap(), "token-2");
    }
}
