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
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use url::Url;

use resources::{
    misc::PrescriptionId,
    validation::{IssueType, Severity, ValidationIssue},
};

use super::{engine::Evaluation, Error, ValidationEngine};

/// Remote findings below this confidence are dropped before merging.
pub const CONFIDENCE_FLOOR: f64 = 0.7;

#[derive(Clone, Debug, Serialize)]
pub struct ModelRequest {
    pub prescription_id: String,
    pub medications: Vec<String>,
    pub dosage_text: Option<String>,
    pub patient_age: Option<u32>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<String>,
    pub conditions: Vec<String>,
}

impl ModelRequest {
    fn from_evaluation(evaluation: &Evaluation) -> Self {
        let prescription = &evaluation.prescription;

        Self {
            prescription_id: prescription.id.to_string(),
            medications: prescription
                .medications
                .iter()
                .map(|medication| medication.display_name().to_string())
                .collect(),
            dosage_text: prescription
                .dosage
                .as_ref()
                .and_then(|dosage| dosage.text.clone()),
            patient_age: evaluation.context.as_ref().and_then(|c| c.age),
            allergies: evaluation
                .context
                .as_ref()
                .map(|c| c.allergies.clone())
                .unwrap_or_default(),
            current_medications: evaluation
                .context
                .as_ref()
                .map(|c| c.current_medications.clone())
                .unwrap_or_default(),
            conditions: evaluation
                .context
                .as_ref()
                .map(|c| c.conditions.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub medications: Vec<String>,
    pub confidence: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelResponse {
    pub result_id: Option<String>,
    #[serde(default)]
    pub issues: Vec<ModelIssue>,
}

/// Pharmacist verdict on a single remote finding, returned to the model
/// provider for retraining.
#[derive(Clone, Debug, Serialize)]
pub struct ValidationFeedback {
    pub result_id: String,
    pub issue_id: String,
    pub is_positive: bool,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ModelApi: Send + Sync {
    async fn analyze(&self, request: &ModelRequest) -> Result<ModelResponse, Error>;

    async fn feedback(&self, feedback: &ValidationFeedback) -> Result<(), Error>;
}

pub struct HttpModelApi {
    client: HttpClient,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpModelApi {
    pub fn new(client: HttpClient, base_url: Url, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<reqwest::Response, Error> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| Error::RemoteModel(err.to_string()))?;

        let mut req = self.client.post(url).json(payload);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let res = req
            .send()
            .await
            .map_err(|err| Error::RemoteModel(err.to_string()))?;

        if !res.status().is_success() {
            return Err(Error::RemoteModel(format!(
                "model endpoint returned status {}",
                res.status().as_u16()
            )));
        }

        Ok(res)
    }
}

#[async_trait]
impl ModelApi for HttpModelApi {
    async fn analyze(&self, request: &ModelRequest) -> Result<ModelResponse, Error> {
        let res = self.post("analyze", request).await?;

        res.json()
            .await
            .map_err(|err| Error::RemoteModel(err.to_string()))
    }

    async fn feedback(&self, feedback: &ValidationFeedback) -> Result<(), Error> {
        self.post("feedback", feedback).await?;

        Ok(())
    }
}

/// Rule engine plus optional remote model. The rule result is always
/// produced; the model can only add findings on top of it, never remove
/// or weaken them.
pub struct ValidationService {
    engine: ValidationEngine,
    model: Option<Arc<dyn ModelApi>>,
    feedback_enabled: bool,
}

impl ValidationService {
    pub fn new(engine: ValidationEngine) -> Self {
        Self {
            engine,
            model: None,
            feedback_enabled: false,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ModelApi>) -> Self {
        self.model = Some(model);

        self
    }

    pub fn with_feedback(mut self, enabled: bool) -> Self {
        self.feedback_enabled = enabled;

        self
    }

    /// Full validation run: rules, then the remote model when configured.
    /// A model failure falls back to the rule-only result and is never an
    /// error to the caller.
    pub async fn validate(&self, id: &PrescriptionId) -> Result<Evaluation, Error> {
        let mut evaluation = self.engine.evaluate(id).await?;

        if let Some(model) = &self.model {
            let request = ModelRequest::from_evaluation(&evaluation);

            match model.analyze(&request).await {
                Ok(response) => {
                    let accepted = accept(response.issues);
                    evaluation.result.extend_with_remote(accepted);
                }
                Err(err) => {
                    warn!("remote model unavailable, using rule result: {}", err);
                }
            }
        }

        self.engine.record(id, &evaluation);
        self.engine.notify_critical(&evaluation);

        Ok(evaluation)
    }

    /// Forwards a pharmacist verdict to the model provider. Failures are
    /// logged and swallowed; feedback must never affect the clinical path.
    pub async fn report_feedback(&self, feedback: ValidationFeedback) {
        if !self.feedback_enabled {
            debug!("feedback collection disabled, dropping verdict");
            return;
        }

        let model = match &self.model {
            Some(model) => model.clone(),
            None => return,
        };

        if let Err(err) = model.feedback(&feedback).await {
            warn!("failed to report validation feedback: {}", err);
        }
    }
}

fn accept(issues: Vec<ModelIssue>) -> Vec<ValidationIssue> {
    issues
        .into_iter()
        .filter(|issue| issue.confidence >= CONFIDENCE_FLOOR)
        .map(|issue| {
            let mut converted = ValidationIssue::new(
                issue.issue_type,
                issue.severity,
                issue.description,
            )
            .with_medications(issue.medications);
            converted.confidence = Some(issue.confidence);
            converted.ai_generated = true;

            converted
        })
        .collect()
}
