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

use resources::prescription::{DosageInstruction, PeriodUnit};

lazy_static! {
    /// Dose-rate phrases, most frequent first so "four times daily" never
    /// falls through to the plain "daily" match. Covers the usual UK
    /// directions-for-use abbreviations.
    static ref RATES: Vec<(Regex, f64)> = vec![
        (
            Regex::new(r"(?i)\b(four times|4 times|qds|qid|every 6 hours)\b").unwrap(),
            4.0,
        ),
        (
            Regex::new(r"(?i)\b(three times|3 times|tds|tid|every 8 hours)\b").unwrap(),
            3.0,
        ),
        (
            Regex::new(r"(?i)\b(twice|two times|2 times|bd|bid|every 12 hours)\b").unwrap(),
            2.0,
        ),
        (
            Regex::new(r"(?i)\b(weekly|every week|every 7 days)\b").unwrap(),
            1.0 / 7.0,
        ),
        (
            Regex::new(r"(?i)\b(once|daily|every day|every 24 hours|od|at night|in the morning)\b")
                .unwrap(),
            1.0,
        ),
    ];
}

/// Doses per day implied by a dosage instruction. Structured timing wins
/// over free text; free text that matches no known phrase counts as one
/// dose a day. `None` only when the instruction carries neither.
pub fn doses_per_day(dosage: &DosageInstruction) -> Option<f64> {
    if let Some(timing) = &dosage.timing {
        if timing.frequency > 0 && timing.period > 0.0 {
            let days = match timing.unit {
                PeriodUnit::Hour => timing.period / 24.0,
                PeriodUnit::Day => timing.period,
                PeriodUnit::Week => timing.period * 7.0,
            };

            return Some(f64::from(timing.frequency) / days);
        }
    }

    let text = dosage.text.as_deref()?;

    Some(
        RATES
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, rate)| *rate)
            .unwrap_or(1.0),
    )
}

/// How many days a dispensed quantity lasts. Zero when the quantity is
/// unusable or the prescription gives no dosage at all; callers treat a
/// zero as "cannot assess".
pub fn estimate(quantity: f64, dosage: Option<&DosageInstruction>) -> u32 {
    if quantity <= 0.0 {
        return 0;
    }

    let rate = match dosage.and_then(doses_per_day) {
        Some(rate) if rate > 0.0 => rate,
        _ => return 0,
    };

    (quantity / rate).round() as u32
}
