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

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use resources::misc::{NhsNumber, PrescriptionId};

/// Structured event handed to the audit collaborator. Patient identifiers
/// are masked and the detail payload is redacted before the event exists,
/// so no sink can leak what was never stored.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditEvent {
    pub action: String,
    pub category: Category,
    pub outcome: Outcome,
    pub patient: Option<String>,
    pub prescription: Option<PrescriptionId>,
    pub detail: Value,
    pub recorded: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Prescription,
    Validation,
    Adherence,
    Security,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl AuditEvent {
    pub fn new<T: Into<String>>(
        action: T,
        category: Category,
        outcome: Outcome,
        recorded: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            category,
            outcome,
            patient: None,
            prescription: None,
            detail: Value::Null,
            recorded,
        }
    }

    pub fn for_patient(mut self, patient: &NhsNumber) -> Self {
        self.patient = Some(patient.masked());

        self
    }

    pub fn for_prescription(mut self, prescription: &PrescriptionId) -> Self {
        self.prescription = Some(prescription.clone());

        self
    }

    pub fn with_detail(mut self, mut detail: Value) -> Self {
        redact(&mut detail);
        self.detail = detail;

        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Default sink: one JSON line per event on the `audit` log target. Real
/// deployments put a persisting sink here.
#[derive(Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => info!(target: "audit", "{}", line),
            Err(err) => warn!(target: "audit", "unserializable audit event: {}", err),
        }
    }
}

/// Replaces the values of sensitive fields with a marker, recursively.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if is_sensitive(key) {
                    *entry = Value::String(REDACTED.into());
                } else {
                    redact(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact(item);
            }
        }
        _ => (),
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();

    MARKERS.iter().any(|marker| key.contains(marker))
}

const REDACTED: &str = "[REDACTED]";

const MARKERS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "phone",
    "mobile",
    "email",
    "address",
    "postcode",
    "birth",
    "dob",
    "demographic",
    "contact",
];
