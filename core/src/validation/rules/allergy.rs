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

/// Cross-sensitivity classes: an allergy to the class name or any member
/// flags every member.
const CLASSES: &[(&str, &[&str])] = &[
    (
        "penicillin",
        &[
            "penicillin",
            "amoxicillin",
            "flucloxacillin",
            "co-amoxiclav",
            "piperacillin",
        ],
    ),
    (
        "nsaid",
        &["aspirin", "ibuprofen", "naproxen", "diclofenac"],
    ),
    (
        "sulfonamide",
        &["sulfamethoxazole", "co-trimoxazole", "sulfasalazine"],
    ),
    ("opioid", &["codeine", "morphine", "tramadol", "oxycodone"]),
];

pub fn check(medications: &[String], context: &PatientContext) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for allergy in &context.allergies {
        let allergy_norm = normalize(allergy);

        for name in medications {
            let med_norm = normalize(name);

            let matched = med_norm == allergy_norm
                || CLASSES.iter().any(|(class, members)| {
                    let allergy_in_class =
                        *class == allergy_norm.as_str() || members.contains(&allergy_norm.as_str());

                    allergy_in_class && members.contains(&med_norm.as_str())
                });

            if matched {
                issues.push(
                    ValidationIssue::new(
                        IssueType::Allergy,
                        Severity::Critical,
                        format!(
                            "{} conflicts with the recorded allergy to {}",
                            name, allergy
                        ),
                    )
                    .with_medications(vec![name.clone()]),
                );
            }
        }
    }

    issues
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use resources::misc::NhsNumber;

    fn context(allergies: &[&str]) -> PatientContext {
        let mut context = PatientContext::new(NhsNumber::new("9434765919").unwrap());
        context.allergies = allergies.iter().map(|s| s.to_string()).collect();

        context
    }

    #[test]
    fn class_allergy_flags_member() {
        let issues = check(
            &["Amoxicillin 500mg capsules".into()],
            &context(&["Penicillin"]),
        );

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Allergy);
        assert_eq!(issues[0].severity, Severity::Critical);
    }

    #[test]
    fn member_allergy_flags_sibling() {
        let issues = check(
            &["Ibuprofen 400mg tablets".into()],
            &context(&["Aspirin 75mg tablets"]),
        );

        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn direct_name_match_outside_classes() {
        let issues = check(
            &["Latanoprost eye drops".into()],
            &context(&["latanoprost"]),
        );

        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn unrelated_allergy_passes() {
        let issues = check(
            &["Paracetamol 500mg tablets".into()],
            &context(&["Penicillin"]),
        );

        assert!(issues.is_empty());
    }
}
