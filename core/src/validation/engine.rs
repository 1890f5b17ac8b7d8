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
use futures::join;
use log::warn;
use serde_json::json;
use tokio::sync::RwLock;

use resources::{
    misc::{NhsNumber, PrescriptionId},
    patient::PatientContext,
    prescription::Prescription,
    validation::{Severity, ValidationIssue, ValidationResult},
};

use crate::{
    audit::{AuditEvent, AuditSink, Category, Outcome},
    client::PrescriptionSource,
    misc::Clock,
    notify::{Notification, NotificationSink},
};

use super::{rules, Error};

/// Patient record lookup the context-dependent checks need. Unknown
/// patients and unreachable backends both surface as
/// [`Error::DependencyUnavailable`]; the engine treats them identically.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn patient_context(&self, patient: &NhsNumber) -> Result<PatientContext, Error>;
}

/// In-memory directory, loaded up front. Stands in for a demographics
/// service in deployments that do not have one.
#[derive(Default)]
pub struct StaticPatientDirectory {
    contexts: RwLock<HashMap<String, PatientContext>>,
}

impl StaticPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, context: PatientContext) {
        let mut contexts = self.contexts.write().await;

        contexts.insert(context.nhs_number.as_string().clone(), context);
    }
}

#[async_trait]
impl PatientDirectory for StaticPatientDirectory {
    async fn patient_context(&self, patient: &NhsNumber) -> Result<PatientContext, Error> {
        let contexts = self.contexts.read().await;

        contexts
            .get(patient.as_string())
            .cloned()
            .ok_or_else(|| {
                Error::DependencyUnavailable(format!(
                    "no patient record for {}",
                    patient.masked()
                ))
            })
    }
}

/// Everything a caller needs after a validation run: the merged result plus
/// the inputs it was computed from.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub result: ValidationResult,
    pub prescription: Prescription,
    pub context: Option<PatientContext>,
}

pub struct ValidationEngine {
    source: Arc<dyn PrescriptionSource>,
    directory: Arc<dyn PatientDirectory>,
    audit: Arc<dyn AuditSink>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ValidationEngine {
    pub fn new(
        source: Arc<dyn PrescriptionSource>,
        directory: Arc<dyn PatientDirectory>,
        audit: Arc<dyn AuditSink>,
        notifications: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            directory,
            audit,
            notifications,
            clock,
        }
    }

    /// Runs every safety check against the prescription. A check that
    /// cannot reach its data contributes nothing and flags the result as
    /// degraded; only failure to load the prescription itself is an error.
    pub async fn evaluate(&self, id: &PrescriptionId) -> Result<Evaluation, Error> {
        let prescription = self.source.prescription(id).await?;
        let medications: Vec<String> = prescription
            .medications
            .iter()
            .map(|medication| medication.display_name().to_string())
            .collect();

        let context = match self.directory.patient_context(&prescription.subject).await {
            Ok(context) => Some(context),
            Err(Error::DependencyUnavailable(reason)) => {
                warn!("patient context unavailable, validating degraded: {}", reason);
                None
            }
            Err(err) => return Err(err),
        };

        let (interactions, allergies, contraindications, dosages): (
            Result<Vec<ValidationIssue>, Error>,
            Result<Vec<ValidationIssue>, Error>,
            Result<Vec<ValidationIssue>, Error>,
            Result<Vec<ValidationIssue>, Error>,
        ) = join!(
            async {
                match &context {
                    Some(context) => Ok(rules::interaction::check(&medications, context)),
                    None => Err(unavailable("interaction")),
                }
            },
            async {
                match &context {
                    Some(context) => Ok(rules::allergy::check(&medications, context)),
                    None => Err(unavailable("allergy")),
                }
            },
            async {
                match &context {
                    Some(context) => Ok(rules::contraindication::check(&medications, context)),
                    None => Err(unavailable("contraindication")),
                }
            },
            async { Ok(rules::dosage::check(&prescription, &medications)) },
        );

        let mut issues = Vec::new();
        let mut degraded = false;

        for outcome in [interactions, allergies, contraindications, dosages] {
            match outcome {
                Ok(found) => issues.extend(found),
                Err(err) => {
                    warn!("check skipped: {}", err);
                    degraded = true;
                }
            }
        }

        let result = ValidationResult::new(issues, degraded, self.clock.now());

        Ok(Evaluation {
            result,
            prescription,
            context,
        })
    }

    /// [`evaluate`] plus the side effects of a clinical run: an audit trail
    /// entry and a notification when anything critical was found.
    ///
    /// [`evaluate`]: Self::evaluate
    pub async fn validate(&self, id: &PrescriptionId) -> Result<Evaluation, Error> {
        let evaluation = self.evaluate(id).await?;

        self.record(id, &evaluation);
        self.notify_critical(&evaluation);

        Ok(evaluation)
    }

    pub(crate) fn record(&self, id: &PrescriptionId, evaluation: &Evaluation) {
        let result = &evaluation.result;
        let event = AuditEvent::new(
            "validate",
            Category::Validation,
            Outcome::Success,
            self.clock.now(),
        )
        .for_patient(&evaluation.prescription.subject)
        .for_prescription(id)
        .with_detail(json!({
            "severity": result.severity,
            "issues": result.issues.len(),
            "is_valid": result.is_valid,
            "degraded": result.degraded,
        }));

        self.audit.record(event);
    }

    pub(crate) fn notify_critical(&self, evaluation: &Evaluation) {
        if evaluation.result.severity < Severity::Critical {
            return;
        }

        let medications: Vec<String> = evaluation
            .result
            .issues
            .iter()
            .filter(|issue| issue.severity == Severity::Critical)
            .flat_map(|issue| issue.medications.iter().cloned())
            .collect();

        self.notifications.notify(Notification::CriticalValidationIssues {
            patient: evaluation.prescription.subject.clone(),
            prescription: evaluation.prescription.id.clone(),
            medications,
        });
    }
}

fn unavailable(check: &str) -> Error {
    Error::DependencyUnavailable(format!("{} check needs the patient record", check))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use resources::prescription::{MedicationReference, Status};

    use crate::client::Error as ClientError;
    use crate::misc::test_support::ManualClock;

    pub struct FixedPrescriptions {
        prescriptions: HashMap<String, Prescription>,
    }

    impl FixedPrescriptions {
        pub fn new(prescriptions: Vec<Prescription>) -> Self {
            Self {
                prescriptions: prescriptions
                    .into_iter()
                    .map(|p| (p.id.to_string(), p))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PrescriptionSource for FixedPrescriptions {
        async fn prescription(&self, id: &PrescriptionId) -> Result<Prescription, ClientError> {
            self.prescriptions
                .get(&id.to_string())
                .cloned()
                .ok_or(ClientError::Registry {
                    status_code: 404,
                    retryable: false,
                    attempts: 1,
                })
        }

        async fn recent_prescriptions(
            &self,
            patient: &NhsNumber,
            _since: DateTime<Utc>,
            _count: usize,
        ) -> Result<Vec<Prescription>, ClientError> {
            Ok(self
                .prescriptions
                .values()
                .filter(|p| &p.subject == patient)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    pub struct RecordingNotifications {
        pub sent: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingNotifications {
        fn notify(&self, notification: Notification) {
            self.sent.lock().unwrap().push(notification);
        }
    }

    #[derive(Default)]
    struct SilentAudit;

    impl AuditSink for SilentAudit {
        fn record(&self, _event: AuditEvent) {}
    }

    pub fn prescription(id: &str, medications: &[&str]) -> Prescription {
        Prescription {
            id: PrescriptionId::new(id).unwrap(),
            status: Status::Active,
            subject: NhsNumber::new("9434765919").unwrap(),
            medications: medications
                .iter()
                .enumerate()
                .map(|(i, name)| MedicationReference::ByCodeableConcept {
                    code: i.to_string(),
                    display: Some(name.to_string()),
                })
                .collect(),
            authored_on: Utc::now(),
            dosage: None,
            dispense_quantity: 28.0,
            validity: None,
        }
    }

    fn engine(
        prescriptions: Vec<Prescription>,
        directory: Arc<StaticPatientDirectory>,
    ) -> (ValidationEngine, Arc<RecordingNotifications>) {
        let notifications = Arc::new(RecordingNotifications::default());
        let engine = ValidationEngine::new(
            Arc::new(FixedPrescriptions::new(prescriptions)),
            directory,
            Arc::new(SilentAudit),
            notifications.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        );

        (engine, notifications)
    }

    async fn directory_with(context: PatientContext) -> Arc<StaticPatientDirectory> {
        let directory = Arc::new(StaticPatientDirectory::new());
        directory.insert(context).await;

        directory
    }

    #[tokio::test]
    async fn clean_prescription_is_valid() {
        let directory =
            directory_with(PatientContext::new(NhsNumber::new("9434765919").unwrap())).await;
        let (engine, notifications) = engine(
            vec![prescription("RX-0001", &["Atenolol 50mg tablets"])],
            directory,
        );

        let evaluation = engine
            .validate(&PrescriptionId::new("RX-0001").unwrap())
            .await
            .unwrap();

        assert!(evaluation.result.is_valid);
        assert!(evaluation.result.issues.is_empty());
        assert!(!evaluation.result.degraded);
        assert_eq!(evaluation.result.severity, Severity::None);
        assert!(notifications.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_patient_record_degrades_but_completes() {
        let directory = Arc::new(StaticPatientDirectory::new());
        let (engine, _) = engine(
            vec![prescription("RX-0002", &["Ibuprofen 800mg tablets"])],
            directory,
        );

        let evaluation = engine
            .evaluate(&PrescriptionId::new("RX-0002").unwrap())
            .await
            .unwrap();

        assert!(evaluation.result.degraded);
        assert!(evaluation.context.is_none());
        // dosage still ran: 800mg once daily is under the ceiling
        assert!(evaluation.result.issues.is_empty());
    }

    #[tokio::test]
    async fn critical_issue_fires_notification() {
        let mut context = PatientContext::new(NhsNumber::new("9434765919").unwrap());
        context.current_medications = vec!["Aspirin 75mg tablets".into()];
        let directory = directory_with(context).await;

        let (engine, notifications) = engine(
            vec![prescription("RX-0003", &["Warfarin 3mg tablets"])],
            directory,
        );

        let evaluation = engine
            .validate(&PrescriptionId::new("RX-0003").unwrap())
            .await
            .unwrap();

        assert!(!evaluation.result.is_valid);
        assert_eq!(evaluation.result.severity, Severity::Critical);

        let sent = notifications.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Notification::CriticalValidationIssues { medications, .. } => {
                assert!(medications.contains(&"Warfarin 3mg tablets".to_string()));
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_prescription_propagates_client_error() {
        let directory = Arc::new(StaticPatientDirectory::new());
        let (engine, _) = engine(vec![], directory);

        let err = engine
            .evaluate(&PrescriptionId::new("RX-MISSING").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ClientError(ClientError::Registry {
                status_code: 404,
                ..
            })
        ));
    }
}
