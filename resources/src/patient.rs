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

use serde::{Deserialize, Serialize};

use super::misc::NhsNumber;

/// Clinical context of a patient as far as the validation checks need it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PatientContext {
    pub nhs_number: NhsNumber,
    pub age: Option<u32>,
    pub allergies: Vec<String>,
    pub current_medications: Vec<String>,
    pub conditions: Vec<String>,
}

impl PatientContext {
    pub fn new(nhs_number: NhsNumber) -> Self {
        Self {
            nhs_number,
            age: None,
            allergies: Vec::new(),
            current_medications: Vec::new(),
            conditions: Vec::new(),
        }
    }
}
