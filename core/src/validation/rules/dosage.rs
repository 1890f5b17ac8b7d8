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

use regex::Regex;

use resources::{
    prescription::Prescription,
    validation::{IssueType, Severity, ValidationIssue},
};

use crate::adherence::doses_per_day;

use super::normalize;

/// Maximum adult daily doses in milligrams (BNF ceilings).
const DAILY_CEILINGS_MG: &[(&str, f64)] = &[
    ("paracetamol", 4000.0),
    ("ibuprofen", 2400.0),
    ("aspirin", 4000.0),
    ("naproxen", 1250.0),
    ("simvastatin", 80.0),
    ("atorvastatin", 80.0),
    ("metformin", 3000.0),
    ("sertraline", 200.0),
    ("tramadol", 400.0),
    ("codeine", 240.0),
    ("amoxicillin", 3000.0),
    ("lisinopril", 80.0),
    ("amlodipine", 10.0),
];

lazy_static! {
    static ref STRENGTH: Regex =
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mg|mcg|microgram(?:s)?|g)\b").unwrap();
}

/// Checks each medication's implied daily intake against its ceiling.
/// Needs only the prescription itself, so it still runs when the patient
/// record is unreachable.
pub fn check(prescription: &Prescription, medications: &[String]) -> Vec<ValidationIssue> {
    let rate = prescription
        .dosage
        .as_ref()
        .and_then(doses_per_day)
        .unwrap_or(1.0);

    let mut issues = Vec::new();

    for name in medications {
        let strength_mg = match strength_mg(name) {
            Some(strength) => strength,
            None => continue,
        };

        let ceiling = match DAILY_CEILINGS_MG
            .iter()
            .find(|(drug, _)| *drug == normalize(name).as_str())
        {
            Some((_, ceiling)) => *ceiling,
            None => continue,
        };

        let daily = strength_mg * rate;
        if daily <= ceiling {
            continue;
        }

        let severity = if daily >= 2.0 * ceiling {
            Severity::Critical
        } else {
            Severity::High
        };

        issues.push(
            ValidationIssue::new(
                IssueType::InappropriateDosage,
                severity,
                format!(
                    "{}: {:.0}mg/day exceeds the {:.0}mg/day maximum",
                    name, daily, ceiling
                ),
            )
            .with_medications(vec![name.clone()]),
        );
    }

    issues
}

fn strength_mg(name: &str) -> Option<f64> {
    let captures = STRENGTH.captures(name)?;
    let amount: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2)?.as_str().to_lowercase();

    match unit.as_str() {
        "g" => Some(amount * 1000.0),
        "mg" => Some(amount),
        _ => Some(amount / 1000.0),
    }
}
