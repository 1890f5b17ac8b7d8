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

struct Contraindication {
    condition: &'static str,
    medication: &'static str,
    severity: Severity,
    reason: &'static str,
}

const fn entry(
    condition: &'static str,
    medication: &'static str,
    severity: Severity,
    reason: &'static str,
) -> Contraindication {
    Contraindication {
        condition,
        medication,
        severity,
        reason,
    }
}

const CONTRAINDICATIONS: &[Contraindication] = &[
    entry("asthma", "aspirin", Severity::High, "may trigger bronchospasm"),
    entry("asthma", "ibuprofen", Severity::High, "may trigger bronchospasm"),
    entry(
        "asthma",
        "propranolol",
        Severity::Critical,
        "non-selective beta blockade risks severe bronchospasm",
    ),
    entry(
        "peptic ulcer",
        "aspirin",
        Severity::Critical,
        "risk of gastrointestinal bleeding",
    ),
    entry(
        "peptic ulcer",
        "ibuprofen",
        Severity::Critical,
        "risk of gastrointestinal bleeding",
    ),
    entry(
        "peptic ulcer",
        "naproxen",
        Severity::Critical,
        "risk of gastrointestinal bleeding",
    ),
    entry(
        "kidney disease",
        "metformin",
        Severity::High,
        "risk of lactic acidosis in renal impairment",
    ),
    entry(
        "kidney disease",
        "ibuprofen",
        Severity::High,
        "nephrotoxic in renal impairment",
    ),
    entry(
        "pregnancy",
        "warfarin",
        Severity::Critical,
        "teratogenic",
    ),
    entry(
        "pregnancy",
        "lisinopril",
        Severity::Critical,
        "fetotoxic in second and third trimester",
    ),
    entry(
        "pregnancy",
        "methotrexate",
        Severity::Critical,
        "teratogenic and abortifacient",
    ),
    entry(
        "heart failure",
        "ibuprofen",
        Severity::High,
        "fluid retention worsens heart failure",
    ),
    entry(
        "heart failure",
        "pioglitazone",
        Severity::High,
        "fluid retention worsens heart failure",
    ),
];

pub fn check(medications: &[String], context: &PatientContext) -> Vec<ValidationIssue> {
    let conditions: Vec<String> = context
        .conditions
        .iter()
        .map(|c| c.to_lowercase())
        .collect();

    let mut issues = Vec::new();

    for name in medications {
        let med_norm = normalize(name);

        for entry in CONTRAINDICATIONS {
            if entry.medication != med_norm.as_str() {
                continue;
            }

            if conditions.iter().any(|c| c.contains(entry.condition)) {
                issues.push(
                    ValidationIssue::new(
                        IssueType::Contraindication,
                        entry.severity,
                        format!(
                            "{} is contraindicated ({}): {}",
                            name, entry.condition, entry.reason
                        ),
                    )
                    .with_medications(vec![name.clone()]),
                );
            }
        }

        // Reye's syndrome: no aspirin under 16
        if med_norm == "aspirin" && context.age.map_or(false, |age| age < 16) {
            issues.push(
                ValidationIssue::new(
                    IssueType::Contraindication,
                    Severity::Critical,
                    format!("{}: contraindicated under 16 (risk of Reye's syndrome)", name),
                )
                .with_medications(vec![name.clone()]),
            );
        }
    }

    issues
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use resources::misc::NhsNumber;

    fn context(conditions: &[&str], age: Option<u32>) -> PatientContext {
        let mut context = PatientContext::new(NhsNumber::new("9434765919").unwrap());
        context.conditions = conditions.iter().map(|s| s.to_string()).collect();
        context.age = age;

        context
    }

    #[test]
    fn condition_substring_matches() {
        let issues = check(
            &["Ibuprofen 400mg tablets".into()],
            &context(&["Severe asthma"], None),
        );

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Contraindication);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn aspirin_under_sixteen_is_critical() {
        let issues = check(&["Aspirin 75mg tablets".into()], &context(&[], Some(12)));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn no_condition_no_issue() {
        let issues = check(
            &["Ibuprofen 400mg tablets".into()],
            &context(&["Hypertension"], Some(40)),
        );

        assert!(issues.is_empty());
    }
}
