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

use resources::{
    patient::PatientContext,
    validation::{IssueType, Severity, ValidationIssue},
};

use super::normalize;

struct Interaction {
    a: &'static str,
    b: &'static str,
    severity: Severity,
    effect: &'static str,
}

const fn interaction(
    a: &'static str,
    b: &'static str,
    severity: Severity,
    effect: &'static str,
) -> Interaction {
    Interaction {
        a,
        b,
        severity,
        effect,
    }
}

/// Known pairwise interactions. A real deployment feeds this from a drug
/// knowledge base; the shape of the check stays the same.
const INTERACTIONS: &[Interaction] = &[
    interaction(
        "warfarin",
        "aspirin",
        Severity::Critical,
        "greatly increased bleeding risk",
    ),
    interaction(
        "warfarin",
        "ibuprofen",
        Severity::High,
        "increased bleeding risk",
    ),
    interaction(
        "warfarin",
        "clarithromycin",
        Severity::High,
        "anticoagulant effect potentiated",
    ),
    interaction(
        "simvastatin",
        "clarithromycin",
        Severity::Critical,
        "risk of myopathy and rhabdomyolysis",
    ),
    interaction(
        "simvastatin",
        "amiodarone",
        Severity::High,
        "risk of myopathy at simvastatin doses above 20mg",
    ),
    interaction(
        "methotrexate",
        "trimethoprim",
        Severity::Critical,
        "risk of severe bone marrow suppression",
    ),
    interaction(
        "sertraline",
        "tramadol",
        Severity::High,
        "risk of serotonin syndrome",
    ),
    interaction(
        "lisinopril",
        "spironolactone",
        Severity::High,
        "risk of hyperkalaemia",
    ),
    interaction(
        "clopidogrel",
        "omeprazole",
        Severity::Medium,
        "reduced antiplatelet effect",
    ),
    interaction(
        "digoxin",
        "amiodarone",
        Severity::High,
        "digoxin levels raised",
    ),
];

/// Flags interacting pairs within the prescription itself and between the
/// prescription and the patient's current medication.
pub fn check(medications: &[String], context: &PatientContext) -> Vec<ValidationIssue> {
    let prescribed: Vec<(String, String)> = medications
        .iter()
        .map(|name| (normalize(name), name.clone()))
        .collect();
    let current: Vec<(String, String)> = context
        .current_medications
        .iter()
        .map(|name| (normalize(name), name.clone()))
        .collect();

    let mut issues = Vec::new();

    for (i, (a_norm, a_name)) in prescribed.iter().enumerate() {
        for (b_norm, b_name) in prescribed.iter().skip(i + 1).chain(current.iter()) {
            let hit = INTERACTIONS.iter().find(|entry| {
                (entry.a == a_norm.as_str() && entry.b == b_norm.as_str())
                    || (entry.a == b_norm.as_str() && entry.b == a_norm.as_str())
            });

            if let Some(hit) = hit {
                issues.push(
                    ValidationIssue::new(
                        IssueType::DrugInteraction,
                        hit.severity,
                        format!("{} with {}: {}", a_name, b_name, hit.effect),
                    )
                    .with_medications(vec![a_name.clone(), b_name.clone()]),
                );
            }
        }
    }

    issues
}
