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

mod backoff;
mod cache;
mod error;
mod token;

pub use backoff::RetryPolicy;
pub use cache::{spawn_sweeper, ResponseCache};
pub use error::Error;
pub use token::{HttpTokenExchange, TokenExchange, TokenManager, TokenResponse};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use reqwest::{Client as HttpClient, Method};
use serde_json::{json, Value};
use tokio::{sync::Mutex, time::sleep};
use url::Url;
use uuid::Uuid;

use resources::{
    misc::{NhsNumber, OdsCode, PrescriptionId},
    prescription::{Prescription, Status},
};

use crate::{
    audit::{AuditEvent, AuditSink, Category, Outcome},
    misc::Clock,
};

/// One request towards the registry, fully assembled. The transport behind
/// [`Exchange`] only moves it over the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait Exchange: Send + Sync {
    async fn send(&self, request: &RegistryRequest) -> Result<RegistryResponse, Error>;
}

pub struct ReqwestExchange {
    client: HttpClient,
    base_url: Url,
}

impl ReqwestExchange {
    pub fn new(client: HttpClient, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Exchange for ReqwestExchange {
    async fn send(&self, request: &RegistryRequest) -> Result<RegistryResponse, Error> {
        let mut url = self.base_url.join(&request.path)?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }

        let mut req = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(&request.bearer)
            .header("X-Correlation-Id", &request.correlation_id);

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status().as_u16();
        let body = res.json().await.unwrap_or(Value::Null);

        Ok(RegistryResponse { status, body })
    }
}

/// Query filters of the list/search operations. `to_query` renders a sorted
/// pair list so equivalent filters produce identical cache signatures.
#[derive(Clone, Debug, Default)]
pub struct SearchFilters {
    pub status: Option<Status>,
    pub authored_from: Option<DateTime<Utc>>,
    pub authored_to: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub patient: Option<NhsNumber>,
    pub prescriber: Option<String>,
    pub count: Option<usize>,
    pub sort: Option<String>,
}

impl SearchFilters {
    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();

        if let Some(status) = self.status {
            query.push(("status".into(), status.as_str().into()));
        }

        if let Some(from) = self.authored_from {
            query.push(("authored".into(), format!("ge{}", from.to_rfc3339())));
        }

        if let Some(to) = self.authored_to {
            query.push(("authored".into(), format!("le{}", to.to_rfc3339())));
        }

        if let Some(text) = &self.text {
            query.push(("_text".into(), text.clone()));
        }

        if let Some(patient) = &self.patient {
            query.push(("patient".into(), patient.as_string().clone()));
        }

        if let Some(prescriber) = &self.prescriber {
            query.push(("requester".into(), prescriber.clone()));
        }

        if let Some(count) = self.count {
            query.push(("_count".into(), count.to_string()));
        }

        if let Some(sort) = &self.sort {
            query.push(("_sort".into(), sort.clone()));
        }

        query.sort();

        query
    }
}

/// Read access the validation engine and the adherence calculator need.
/// [`RegistryClient`] is the production implementation.
#[async_trait]
pub trait PrescriptionSource: Send + Sync {
    async fn prescription(&self, id: &PrescriptionId) -> Result<Prescription, Error>;

    async fn recent_prescriptions(
        &self,
        patient: &NhsNumber,
        since: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Prescription>, Error>;
}

/// Client towards the national prescribing registry: token handling,
/// response caching, retry with backoff, audit emission.
pub struct RegistryClient {
    exchange: Arc<dyn Exchange>,
    tokens: Arc<TokenManager>,
    cache: Arc<ResponseCache>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

struct AuditContext {
    patient: Option<NhsNumber>,
    prescription: Option<PrescriptionId>,
}

impl RegistryClient {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        tokens: Arc<TokenManager>,
        cache: Arc<ResponseCache>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            exchange,
            tokens,
            cache,
            audit,
            clock,
            retry: RetryPolicy::default(),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;

        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Mutex::new(rng);

        self
    }

    pub async fn get_prescription(&self, id: &PrescriptionId) -> Result<Prescription, Error> {
        let key = format!("prescription/{}", id);

        if let Some(hit) = self.cache.get(&key).await {
            return Ok(serde_json::from_value(hit)?);
        }

        let ctx = AuditContext {
            patient: None,
            prescription: Some(id.clone()),
        };
        let response = self
            .execute(
                "get_prescription",
                Method::GET,
                format!("MedicationRequest/{}", id),
                Vec::new(),
                None,
                ctx,
            )
            .await?;
        let prescription = serde_json::from_value(response.body.clone())?;

        self.cache
            .set(&key, response.body, PRESCRIPTION_DETAIL_TTL)
            .await;

        Ok(prescription)
    }

    pub async fn list_for_pharmacy(
        &self,
        pharmacy: &OdsCode,
        filters: &SearchFilters,
    ) -> Result<Vec<Prescription>, Error> {
        let mut query = filters.to_query();
        query.push(("performer".into(), pharmacy.as_string().clone()));
        query.sort();

        let ctx = AuditContext {
            patient: None,
            prescription: None,
        };

        self.cached_list(
            "list_for_pharmacy",
            &format!("pharmacy/{}", pharmacy.as_string()),
            query,
            ctx,
        )
        .await
    }

    pub async fn list_for_patient(
        &self,
        patient: &NhsNumber,
        filters: &SearchFilters,
    ) -> Result<Vec<Prescription>, Error> {
        let mut query = filters.to_query();
        query.push(("patient".into(), patient.as_string().clone()));
        query.sort();
        query.dedup();

        let ctx = AuditContext {
            patient: Some(patient.clone()),
            prescription: None,
        };

        self.cached_list(
            "list_for_patient",
            &format!("patient/{}", patient.as_string()),
            query,
            ctx,
        )
        .await
    }

    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<Prescription>, Error> {
        let ctx = AuditContext {
            patient: filters.patient.clone(),
            prescription: None,
        };

        self.cached_list("search", "search", filters.to_query(), ctx)
            .await
    }

    pub async fn update_status(
        &self,
        id: &PrescriptionId,
        status: Status,
        reason: Option<&str>,
    ) -> Result<Prescription, Error> {
        self.transition("update_status", id, status, reason).await
    }

    pub async fn cancel(&self, id: &PrescriptionId, reason: &str) -> Result<Prescription, Error> {
        self.transition("cancel", id, Status::Cancelled, Some(reason))
            .await
    }

    pub async fn complete(&self, id: &PrescriptionId) -> Result<Prescription, Error> {
        self.transition("complete", id, Status::Completed, None).await
    }

    async fn cached_list(
        &self,
        op: &str,
        key_prefix: &str,
        query: Vec<(String, String)>,
        ctx: AuditContext,
    ) -> Result<Vec<Prescription>, Error> {
        let key = cache_key(key_prefix, &query);

        if let Some(hit) = self.cache.get(&key).await {
            return parse_list(hit);
        }

        let response = self
            .execute(op, Method::GET, "MedicationRequest".into(), query, None, ctx)
            .await?;
        let list = parse_list(response.body.clone())?;

        self.cache.set(&key, response.body, LIST_TTL).await;

        Ok(list)
    }

    /// Writes read the current state fresh (never from cache), enforce the
    /// transition invariant locally, and invalidate affected cache entries
    /// on success.
    async fn transition(
        &self,
        op: &str,
        id: &PrescriptionId,
        status: Status,
        reason: Option<&str>,
    ) -> Result<Prescription, Error> {
        let read_ctx = AuditContext {
            patient: None,
            prescription: Some(id.clone()),
        };
        let current = self
            .execute(
                op,
                Method::GET,
                format!("MedicationRequest/{}", id),
                Vec::new(),
                None,
                read_ctx,
            )
            .await?;
        let current: Prescription = serde_json::from_value(current.body)?;

        if !current.status.can_transition_to(status) {
            return Err(Error::InvalidStatusTransition {
                from: current.status,
                to: status,
            });
        }

        let body = json!({
            "status": status,
            "reason": reason,
        });
        let ctx = AuditContext {
            patient: Some(current.subject.clone()),
            prescription: Some(id.clone()),
        };
        let response = self
            .execute(
                op,
                Method::PUT,
                format!("MedicationRequest/{}/$status", id),
                Vec::new(),
                Some(body),
                ctx,
            )
            .await?;

        let updated = if response.body.is_null() {
            Prescription {
                status,
                ..current.clone()
            }
        } else {
            serde_json::from_value(response.body)?
        };

        self.cache.invalidate(&format!("prescription/{}", id)).await;
        self.cache
            .invalidate_prefix(&format!("patient/{}", current.subject.as_string()))
            .await;
        self.cache.invalidate_prefix("pharmacy/").await;
        self.cache.invalidate_prefix("search").await;

        Ok(updated)
    }

    async fn execute(
        &self,
        op: &str,
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        body: Option<Value>,
        ctx: AuditContext,
    ) -> Result<RegistryResponse, Error> {
        let correlation_id = Uuid::new_v4().to_string();
        let mut token = self.tokens.get_token().await?;
        let mut refreshed = false;
        let mut attempts = 0u32;

        loop {
            attempts += 1;

            let request = RegistryRequest {
                method: method.clone(),
                path: path.clone(),
                query: query.clone(),
                body: body.clone(),
                bearer: token.clone(),
                correlation_id: correlation_id.clone(),
            };
            let response = self.exchange.send(&request).await?;

            if response.status < 400 {
                debug!(
                    "registry {} succeeded (correlation_id={}, attempts={})",
                    op, correlation_id, attempts
                );

                self.audit.record(self.event(op, Outcome::Success, &ctx).with_detail(
                    json!({
                        "correlation_id": correlation_id,
                        "attempts": attempts,
                    }),
                ));

                return Ok(response);
            }

            // a rejected token gets one fresh exchange and one re-issue
            if response.status == 401 && !refreshed {
                warn!(
                    "registry {} rejected token, refreshing once (correlation_id={})",
                    op, correlation_id
                );

                self.tokens.invalidate().await;
                token = self.tokens.get_token().await?;
                refreshed = true;

                continue;
            }

            let retryable = RetryPolicy::is_retryable(response.status);

            if retryable && attempts <= self.retry.max_retries {
                let delay = {
                    let mut rng = self.rng.lock().await;
                    self.retry.delay(attempts - 1, &mut **rng)
                };

                warn!(
                    "registry {} returned {}, retrying in {:?} (correlation_id={}, attempt {}/{})",
                    op,
                    response.status,
                    delay,
                    correlation_id,
                    attempts,
                    self.retry.max_retries + 1,
                );

                sleep(delay).await;

                continue;
            }

            // plain rate limiting is kept out of the audit trail
            if response.status != 429 {
                self.audit.record(self.event(op, Outcome::Failure, &ctx).with_detail(
                    json!({
                        "correlation_id": correlation_id,
                        "status_code": response.status,
                        "retryable": retryable,
                        "attempts": attempts,
                    }),
                ));
            }

            return Err(Error::Registry {
                status_code: response.status,
                retryable,
                attempts,
            });
        }
    }

    fn event(&self, op: &str, outcome: Outcome, ctx: &AuditContext) -> AuditEvent {
        let mut event = AuditEvent::new(op, Category::Prescription, outcome, self.clock.now());

        if let Some(patient) = &ctx.patient {
            event = event.for_patient(patient);
        }

        if let Some(prescription) = &ctx.prescription {
            event = event.for_prescription(prescription);
        }

        event
    }
}

#[async_trait]
impl PrescriptionSource for RegistryClient {
    async fn prescription(&self, id: &PrescriptionId) -> Result<Prescription, Error> {
        self.get_prescription(id).await
    }

    async fn recent_prescriptions(
        &self,
        patient: &NhsNumber,
        since: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Prescription>, Error> {
        let filters = SearchFilters {
            authored_from: Some(since),
            count: Some(count),
            sort: Some("-authored".into()),
            ..SearchFilters::default()
        };

        let list = self.list_for_patient(patient, &filters).await?;

        Ok(list
            .into_iter()
            .filter(|p| matches!(p.status, Status::Active | Status::Completed))
            .collect())
    }
}

fn cache_key(prefix: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return prefix.to_owned();
    }

    let query = query
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", prefix, query)
}

fn parse_list(value: Value) -> Result<Vec<Prescription>, Error> {
    match value.get("entry") {
        Some(Value::Array(entries)) => entries
            .iter()
            .cloned()
            .map(|entry| serde_json::from_value(entry).map_err(Error::from))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

const PRESCRIPTION_DETAIL_TTL: Duration = Duration::from_secs(15 * 60);
const LIST_TTL: Duration = Duration::from_secs(5 * 60);

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use tokio::time::Instant;

    use crate::audit::LogAuditSink;
    use crate::misc::test_support::ManualClock;

    pub struct ScriptedExchange {
        responses: StdMutex<VecDeque<RegistryResponse>>,
        pub requests: StdMutex<Vec<RegistryRequest>>,
    }

    impl ScriptedExchange {
        pub fn new(responses: Vec<RegistryResponse>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                requests: StdMutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Exchange for ScriptedExchange {
        async fn send(&self, request: &RegistryRequest) -> Result<RegistryResponse, Error> {
            self.requests.lock().unwrap().push(request.clone());

            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected request");

            Ok(response)
        }
    }

    struct StaticTokens {
        counter: StdMutex<usize>,
    }

    #[async_trait]
    impl TokenExchange for StaticTokens {
        async fn exchange(
            &self,
            _client_id: &str,
            _client_secret: &str,
        ) -> Result<TokenResponse, Error> {
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;

            Ok(TokenResponse {
                access_token: format!("token-{}", counter),
                expires_in: 3600,
            })
        }
    }

    pub struct RecordingAudit {
        pub events: StdMutex<Vec<AuditEvent>>,
    }

    impl AuditSink for RecordingAudit {
        fn record(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn response(status: u16, body: Value) -> RegistryResponse {
        RegistryResponse { status, body }
    }

    fn prescription_body(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "status": status,
            "subject": "9434765919",
            "medications": [
                { "kind": "by-codeable-concept", "code": "322236009", "display": "Paracetamol 500mg tablets" },
            ],
            "authored_on": "2026-02-01T09:00:00Z",
            "dosage": { "text": "twice daily", "timing": null },
            "dispense_quantity": 56.0,
            "validity": null,
        })
    }

    fn client(exchange: Arc<ScriptedExchange>, audit: Arc<dyn AuditSink>) -> RegistryClient {
        let clock = Arc::new(ManualClock::new(Utc.ymd(2026, 3, 1).and_hms(8, 0, 0)));
        let tokens = Arc::new(TokenManager::new(
            Arc::new(StaticTokens {
                counter: StdMutex::new(0),
            }),
            clock.clone(),
            "pharmacy-app".into(),
            "s3cr3t".into(),
        ));
        let cache = Arc::new(ResponseCache::new(clock.clone()));

        RegistryClient::new(exchange, tokens, cache, audit, clock)
            .with_rng(Box::new(StdRng::seed_from_u64(7)))
    }

    fn prescription_id() -> PrescriptionId {
        PrescriptionId::new("83C40E-A23856-00123C").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_statuses_exhaust_retries_with_backoff() {
        for status in &[429u16, 503, 504] {
            let exchange = Arc::new(ScriptedExchange::new(vec![
                response(*status, Value::Null),
                response(*status, Value::Null),
                response(*status, Value::Null),
                response(*status, Value::Null),
            ]));
            let client = client(exchange.clone(), Arc::new(LogAuditSink));

            let started = Instant::now();
            let err = client.get_prescription(&prescription_id()).await.unwrap_err();

            match err {
                Error::Registry {
                    status_code,
                    retryable,
                    attempts,
                } => {
                    assert_eq!(status_code, *status);
                    assert!(retryable);
                    assert_eq!(attempts, 4);
                }
                other => panic!("unexpected error: {:?}", other),
            }

            assert_eq!(exchange.calls(), 4);
            // delays of at least 1s, 2s and 4s between the four attempts
            assert!(started.elapsed() >= std::time::Duration::from_secs(7));
        }
    }

    #[tokio::test]
    async fn terminal_status_makes_exactly_one_attempt() {
        let exchange = Arc::new(ScriptedExchange::new(vec![response(404, Value::Null)]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));

        let err = client.get_prescription(&prescription_id()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Registry {
                status_code: 404,
                retryable: false,
                attempts: 1,
            }
        ));
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_a_retry_succeeds() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            response(503, Value::Null),
            response(200, prescription_body("83C40E-A23856-00123C", "active")),
        ]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));

        let prescription = client.get_prescription(&prescription_id()).await.unwrap();

        assert_eq!(prescription.status, Status::Active);
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test]
    async fn unauthorized_gets_one_fresh_token_then_surfaces() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            response(401, Value::Null),
            response(200, prescription_body("83C40E-A23856-00123C", "active")),
        ]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));

        client.get_prescription(&prescription_id()).await.unwrap();

        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].bearer, "token-1");
        assert_eq!(requests[1].bearer, "token-2");
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let exchange = Arc::new(ScriptedExchange::new(vec![response(
            200,
            prescription_body("83C40E-A23856-00123C", "active"),
        )]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));
        let id = prescription_id();

        client.get_prescription(&id).await.unwrap();
        client.get_prescription(&id).await.unwrap();

        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn cancel_of_cancelled_prescription_is_rejected() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            // first cancel: precheck read, then write
            response(200, prescription_body("83C40E-A23856-00123C", "active")),
            response(200, prescription_body("83C40E-A23856-00123C", "cancelled")),
            // second cancel: precheck read sees the cancelled state
            response(200, prescription_body("83C40E-A23856-00123C", "cancelled")),
        ]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));
        let id = prescription_id();

        client.cancel(&id, "patient request").await.unwrap();

        let err = client.cancel(&id, "patient request").await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStatusTransition {
                from: Status::Cancelled,
                to: Status::Cancelled,
            }
        ));
        assert_eq!(exchange.calls(), 3);
    }

    #[tokio::test]
    async fn write_invalidates_cached_reads() {
        let exchange = Arc::new(ScriptedExchange::new(vec![
            response(200, prescription_body("83C40E-A23856-00123C", "active")),
            // complete: precheck read + write
            response(200, prescription_body("83C40E-A23856-00123C", "active")),
            response(200, prescription_body("83C40E-A23856-00123C", "completed")),
            // re-read must hit the registry again
            response(200, prescription_body("83C40E-A23856-00123C", "completed")),
        ]));
        let client = client(exchange.clone(), Arc::new(LogAuditSink));
        let id = prescription_id();

        client.get_prescription(&id).await.unwrap();
        client.complete(&id).await.unwrap();
        let after = client.get_prescription(&id).await.unwrap();

        assert_eq!(after.status, Status::Completed);
        assert_eq!(exchange.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_failures_are_not_audited() {
        let audit = Arc::new(RecordingAudit {
            events: StdMutex::new(Vec::new()),
        });
        let exchange = Arc::new(ScriptedExchange::new(vec![
            response(429, Value::Null),
            response(429, Value::Null),
            response(429, Value::Null),
            response(429, Value::Null),
        ]));
        let client = client(exchange, audit.clone());

        let _ = client.get_prescription(&prescription_id()).await;

        assert!(audit.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_reads_are_audited_with_correlation_id() {
        let audit = Arc::new(RecordingAudit {
            events: StdMutex::new(Vec::new()),
        });
        let exchange = Arc::new(ScriptedExchange::new(vec![response(
            200,
            prescription_body("83C40E-A23856-00123C", "active"),
        )]));
        let client = client(exchange.clone(), audit.clone());

        client.get_prescription(&prescription_id()).await.unwrap();

        let events = audit.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "get_prescription");
        assert_eq!(events[0].outcome, Outcome::Success);
        assert_eq!(events[0].detail["attempts"], 1);

        let correlation_id = events[0].detail["correlation_id"].as_str().unwrap();
        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests[0].correlation_id, correlation_id);
    }

    #[tokio::test]
    async fn cache_hits_emit_no_audit_event() {
        let audit = Arc::new(RecordingAudit {
            events: StdMutex::new(Vec::new()),
        });
        let exchange = Arc::new(ScriptedExchange::new(vec![response(
            200,
            prescription_body("83C40E-A23856-00123C", "active"),
        )]));
        let client = client(exchange, audit.clone());
        let id = prescription_id();

        client.get_prescription(&id).await.unwrap();
        client.get_prescription(&id).await.unwrap();

        // only the registry round trip is audited, not the cached read
        assert_eq!(audit.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn terminal_failures_are_audited_with_correlation_id() {
        let audit = Arc::new(RecordingAudit {
            events: StdMutex::new(Vec::new()),
        });
        let exchange = Arc::new(ScriptedExchange::new(vec![response(500, Value::Null)]));
        let client = client(exchange.clone(), audit.clone());

        let _ = client.get_prescription(&prescription_id()).await;

        let events = audit.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "get_prescription");
        assert_eq!(events[0].outcome, Outcome::Failure);

        let correlation_id = events[0].detail["correlation_id"].as_str().unwrap();
        let requests = exchange.requests.lock().unwrap();
        assert_eq!(requests[0].correlation_id, correlation_id);
    }

    #[test]
    fn cache_keys_are_order_independent() {
        let a = SearchFilters {
            status: Some(Status::Active),
            count: Some(10),
            ..SearchFilters::default()
        };
        let b = SearchFilters {
            count: Some(10),
            status: Some(Status::Active),
            ..SearchFilters::default()
        };

        assert_eq!(cache_key("search", &a.to_query()), cache_key("search", &b.to_query()));
    }
}
