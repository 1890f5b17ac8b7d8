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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::misc::NhsNumber;

/// Last-known adherence snapshot of a patient. Recomputed wholesale on each
/// calculation, never patched incrementally.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AdherenceRecord {
    pub patient: NhsNumber,
    pub score: u8,
    pub status: AdherenceStatus,
    pub trend: Trend,
    pub calculated_at: DateTime<Utc>,
    pub medications: Vec<MedicationAdherence>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MedicationAdherence {
    pub medication: String,
    pub score: u8,
    pub status: AdherenceStatus,
    pub last_filled: DateTime<Utc>,
    pub next_due: Option<DateTime<Utc>>,
    pub days_supply: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdherenceStatus {
    Optimal,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl AdherenceStatus {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=100 => Self::Optimal,
            75..=89 => Self::Good,
            50..=74 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    Unknown,
}

impl Trend {
    /// Compares a freshly computed overall score against the previously
    /// stored one; a shift of five points or more counts as a change.
    pub fn classify(score: u8, previous: Option<u8>) -> Self {
        let previous = match previous {
            Some(previous) => previous,
            None => return Self::Unknown,
        };

        let delta = i16::from(score) - i16::from(previous);
        if delta >= 5 {
            Self::Improving
        } else if delta <= -5 {
            Self::Declining
        } else {
            Self::Stable
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(AdherenceStatus::from_score(100), AdherenceStatus::Optimal);
        assert_eq!(AdherenceStatus::from_score(90), AdherenceStatus::Optimal);
        assert_eq!(AdherenceStatus::from_score(89), AdherenceStatus::Good);
        assert_eq!(AdherenceStatus::from_score(75), AdherenceStatus::Good);
        assert_eq!(AdherenceStatus::from_score(74), AdherenceStatus::Fair);
        assert_eq!(AdherenceStatus::from_score(50), AdherenceStatus::Fair);
        assert_eq!(AdherenceStatus::from_score(49), AdherenceStatus::Poor);
        assert_eq!(AdherenceStatus::from_score(0), AdherenceStatus::Poor);
    }

    #[test]
    fn trend_classification() {
        assert_eq!(Trend::classify(80, None), Trend::Unknown);
        assert_eq!(Trend::classify(80, Some(74)), Trend::Improving);
        assert_eq!(Trend::classify(80, Some(85)), Trend::Declining);
        assert_eq!(Trend::classify(80, Some(76)), Trend::Stable);
        assert_eq!(Trend::classify(80, Some(84)), Trend::Stable);
    }
}
