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
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::misc::{NhsNumber, PrescriptionId};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub status: Status,
    pub subject: NhsNumber,
    pub medications: Vec<MedicationReference>,
    pub authored_on: DateTime<Utc>,
    pub dosage: Option<DosageInstruction>,
    pub dispense_quantity: f64,
    pub validity: Option<ValidityPeriod>,
}

/// Medication entry of a prescription. Registry payloads carry either a
/// resource reference or an inline coded concept; both resolve to a display
/// name through [`display_name`](MedicationReference::display_name).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MedicationReference {
    ByReference {
        reference: String,
        display: Option<String>,
    },
    ByCodeableConcept {
        code: String,
        display: Option<String>,
    },
}

impl MedicationReference {
    pub fn display_name(&self) -> &str {
        match self {
            Self::ByReference { display, reference } => display
                .as_deref()
                .unwrap_or_else(|| reference.rsplit('/').next().unwrap_or(reference.as_str())),
            Self::ByCodeableConcept { display, code } => display.as_deref().unwrap_or(code),
        }
    }
}

#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct DosageInstruction {
    pub text: Option<String>,
    pub timing: Option<Timing>,
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Timing {
    pub frequency: u32,
    pub period: f64,
    pub unit: PeriodUnit,
}

#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum PeriodUnit {
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "wk")]
    Week,
}

#[derive(Clone, Default, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValidityPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Active,
    OnHold,
    Cancelled,
    Completed,
    EnteredInError,
    Stopped,
    Draft,
    Unknown,
}

impl Status {
    /// Transitions the core may request within one dispensing cycle. The
    /// registry originates prescriptions; everything not listed here is
    /// rejected before a request is even issued.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Active, Status::Completed)
                | (Status::Active, Status::Cancelled)
                | (Status::Active, Status::OnHold)
                | (Status::OnHold, Status::Active)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on-hold",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::EnteredInError => "entered-in-error",
            Self::Stopped => "stopped",
            Self::Draft => "draft",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "on-hold" => Ok(Self::OnHold),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "entered-in-error" => Ok(Self::EnteredInError),
            "stopped" => Ok(Self::Stopped),
            "draft" => Ok(Self::Draft),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid prescription status: {}", s)),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn transitions_within_dispensing_cycle() {
        assert!(Status::Active.can_transition_to(Status::Completed));
        assert!(Status::Active.can_transition_to(Status::Cancelled));
        assert!(Status::Active.can_transition_to(Status::OnHold));
        assert!(Status::OnHold.can_transition_to(Status::Active));
    }

    #[test]
    fn completed_and_cancelled_are_final() {
        for from in &[Status::Completed, Status::Cancelled] {
            for to in &[
                Status::Active,
                Status::OnHold,
                Status::Completed,
                Status::Cancelled,
            ] {
                assert!(!from.can_transition_to(*to));
            }
        }
    }

    #[test]
    fn display_name_prefers_display_text() {
        let med = MedicationReference::ByCodeableConcept {
            code: "322236009".into(),
            display: Some("Paracetamol 500mg tablets".into()),
        };

        assert_eq!(med.display_name(), "Paracetamol 500mg tablets");
    }

    #[test]
    fn display_name_falls_back_to_reference_tail() {
        let med = MedicationReference::ByReference {
            reference: "Medication/med-0815".into(),
            display: None,
        };

        assert_eq!(med.display_name(), "med-0815");
    }

    #[test]
    fn medication_reference_wire_format() {
        let med = MedicationReference::ByReference {
            reference: "Medication/med-0815".into(),
            display: None,
        };
        let value = serde_json::to_value(&med).unwrap();

        assert_eq!(value["kind"], "by-reference");

        let parsed: MedicationReference = serde_json::from_value(serde_json::json!({
            "kind": "by-codeable-concept",
            "code": "322236009",
            "display": "Paracetamol 500mg tablets",
        }))
        .unwrap();

        assert_eq!(parsed.display_name(), "Paracetamol 500mg tablets");
    }

    #[test]
    fn status_round_trip() {
        for s in &["active", "on-hold", "entered-in-error", "unknown"] {
            let status: Status = s.parse().unwrap();

            assert_eq!(&status.as_str(), s);
        }
    }
}
