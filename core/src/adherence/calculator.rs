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

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tokio::sync::RwLock;

use resources::{
    adherence::{AdherenceRecord, AdherenceStatus, MedicationAdherence, Trend},
    misc::NhsNumber,
    prescription::Prescription,
};

use crate::{
    audit::{AuditEvent, AuditSink, Category, Outcome},
    client::PrescriptionSource,
    misc::Clock,
    notify::{Notification, NotificationSink},
};

use super::{days_supply, Error};

/// Fill history window and fetch cap for one calculation.
pub const HISTORY_WINDOW_DAYS: i64 = 365;
pub const HISTORY_LIMIT: usize = 50;

/// A refill this many days past the expected date still counts as on time.
const ON_TIME_GRACE_DAYS: i64 = 3;

/// Beyond this the gap earns nothing at all.
const LATE_LIMIT_DAYS: i64 = 14;

/// Persistence of adherence snapshots. The previous snapshot feeds the
/// trend classification of the next run.
#[async_trait]
pub trait AdherenceStore: Send + Sync {
    async fn load(&self, patient: &NhsNumber) -> Option<AdherenceRecord>;

    async fn replace(&self, record: AdherenceRecord);
}

#[derive(Default)]
pub struct InMemoryAdherenceStore {
    records: RwLock<HashMap<String, AdherenceRecord>>,
}

impl InMemoryAdherenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdherenceStore for InMemoryAdherenceStore {
    async fn load(&self, patient: &NhsNumber) -> Option<AdherenceRecord> {
        let records = self.records.read().await;

        records.get(patient.as_string()).cloned()
    }

    async fn replace(&self, record: AdherenceRecord) {
        let mut records = self.records.write().await;

        records.insert(record.patient.as_string().clone(), record);
    }
}

struct Fill {
    filled_at: DateTime<Utc>,
    days_supply: u32,
}

pub struct AdherenceCalculator {
    source: Arc<dyn PrescriptionSource>,
    store: Arc<dyn AdherenceStore>,
    audit: Arc<dyn AuditSink>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl AdherenceCalculator {
    pub fn new(
        source: Arc<dyn PrescriptionSource>,
        store: Arc<dyn AdherenceStore>,
        audit: Arc<dyn AuditSink>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            audit,
            notifications,
            clock,
        }
    }

    /// Recomputes the patient's adherence snapshot from a year of refill
    /// history, persists it and fires reminders for anything overdue.
    pub async fn calculate(&self, patient: &NhsNumber) -> Result<AdherenceRecord, Error> {
        let now = self.clock.now();
        let since = now - Duration::days(HISTORY_WINDOW_DAYS);

        let prescriptions = self
            .source
            .recent_prescriptions(patient, since, HISTORY_LIMIT)
            .await?;

        let mut medications: Vec<MedicationAdherence> = group_fills(&prescriptions)
            .into_iter()
            .map(|(medication, fills)| assess(medication, fills))
            .collect();
        medications.sort_by(|a, b| a.medication.cmp(&b.medication));

        let score = overall_score(&medications);
        let status = if medications.is_empty() {
            AdherenceStatus::Unknown
        } else {
            AdherenceStatus::from_score(score)
        };

        // even an empty result is compared against the previous snapshot;
        // trend is only unknown when no prior score exists
        let previous = self.store.load(patient).await;
        let trend = Trend::classify(score, previous.map(|record| record.score));

        let record = AdherenceRecord {
            patient: patient.clone(),
            score,
            status,
            trend,
            calculated_at: now,
            medications,
        };

        self.store.replace(record.clone()).await;
        self.remind_overdue(&record, now);

        self.audit.record(
            AuditEvent::new("calculate_adherence", Category::Adherence, Outcome::Success, now)
                .for_patient(patient)
                .with_detail(json!({
                    "score": record.score,
                    "status": record.status,
                    "trend": record.trend,
                    "medications": record.medications.len(),
                })),
        );

        Ok(record)
    }

    fn remind_overdue(&self, record: &AdherenceRecord, now: DateTime<Utc>) {
        for medication in &record.medications {
            if let Some(next_due) = medication.next_due {
                if next_due < now {
                    self.notifications.notify(Notification::AdherenceReminderDue {
                        patient: record.patient.clone(),
                        medication: medication.medication.clone(),
                        next_due,
                    });
                }
            }
        }
    }
}

/// One fill per medication per prescription; multi-medication
/// prescriptions contribute a fill to each of their medications.
fn group_fills(prescriptions: &[Prescription]) -> HashMap<String, Vec<Fill>> {
    let mut groups: HashMap<String, Vec<Fill>> = HashMap::new();

    for prescription in prescriptions {
        let supply =
            days_supply::estimate(prescription.dispense_quantity, prescription.dosage.as_ref());

        for medication in &prescription.medications {
            groups
                .entry(medication.display_name().to_string())
                .or_default()
                .push(Fill {
                    filled_at: prescription.authored_on,
                    days_supply: supply,
                });
        }
    }

    for fills in groups.values_mut() {
        fills.sort_by_key(|fill| fill.filled_at);
    }

    groups
}

/// Scores one medication's refill pattern. Each consecutive pair of fills
/// is a gap: refilled within the grace period earns full credit, up to two
/// weeks late earns half, later earns nothing. Fewer than two usable fills
/// means there is nothing to judge, which scores as fully adherent.
fn assess(medication: String, fills: Vec<Fill>) -> MedicationAdherence {
    let mut gaps = 0u32;
    let mut on_time = 0u32;
    let mut late = 0u32;

    for pair in fills.windows(2) {
        if pair[0].days_supply == 0 {
            continue;
        }

        let expected = pair[0].filled_at + Duration::days(i64::from(pair[0].days_supply));
        let overdue_days = (pair[1].filled_at - expected).num_days();

        gaps += 1;
        if overdue_days <= ON_TIME_GRACE_DAYS {
            on_time += 1;
        } else if overdue_days <= LATE_LIMIT_DAYS {
            late += 1;
        }
    }

    let score = if gaps == 0 {
        100
    } else {
        (f64::from(on_time * 100 + late * 50) / f64::from(gaps)).round() as u8
    };

    // sort order guarantees the last fill is the latest
    let last = fills.last().expect("a medication group is never empty");
    let next_due = if last.days_supply > 0 {
        Some(last.filled_at + Duration::days(i64::from(last.days_supply)))
    } else {
        None
    };

    MedicationAdherence {
        medication,
        score,
        status: AdherenceStatus::from_score(score),
        last_filled: last.filled_at,
        next_due,
        days_supply: last.days_supply,
    }
}

fn overall_score(medications: &[MedicationAdherence]) -> u8 {
    if medications.is_empty() {
        return 0;
    }

    let sum: u32 = medications.iter().map(|m| u32::from(m.score)).sum();

    (f64::from(sum) / medications.len() as f64).round() as u8
}
