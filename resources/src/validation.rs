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

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a single finding. Variant order is the ranking, so `Ord`
/// picks the dominant severity of an issue set.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    DrugInteraction,
    InappropriateDosage,
    Allergy,
    Contraindication,
}

/// One finding of a validation run. Immutable once produced; a new run
/// produces a new issue set.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub medications: Vec<String>,
    pub confidence: Option<f64>,
    pub ai_generated: bool,
}

impl ValidationIssue {
    pub fn new<T: Into<String>>(issue_type: IssueType, severity: Severity, description: T) -> Self {
        Self {
            issue_type,
            severity,
            description: description.into(),
            medications: Vec::new(),
            confidence: None,
            ai_generated: false,
        }
    }

    pub fn with_medications(mut self, medications: Vec<String>) -> Self {
        self.medications = medications;

        self
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub severity: Severity,
    pub is_valid: bool,

    /// One or more rule checks could not reach their data dependency and
    /// contributed nothing. The run still completed.
    pub degraded: bool,
    pub ai_enhanced: bool,
    pub calculated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn new(issues: Vec<ValidationIssue>, degraded: bool, calculated_at: DateTime<Utc>) -> Self {
        let severity = max_severity(&issues);

        Self {
            is_valid: issues.is_empty(),
            issues,
            severity,
            degraded,
            ai_enhanced: false,
            calculated_at,
        }
    }

    /// Unions remote-model findings into this result and recomputes the
    /// aggregate fields. Rule-based issues of the same type are kept, the
    /// two sources count as independent evidence.
    pub fn extend_with_remote(&mut self, issues: Vec<ValidationIssue>) {
        self.issues.extend(issues);
        self.severity = max_severity(&self.issues);
        self.is_valid = self.issues.is_empty();
        self.ai_enhanced = true;
    }
}

fn max_severity(issues: &[ValidationIssue]) -> Severity {
    issues
        .iter()
        .map(|issue| issue.severity)
        .max()
        .unwrap_or(Severity::None)
}
