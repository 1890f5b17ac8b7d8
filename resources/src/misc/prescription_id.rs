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

use std::convert::TryFrom;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Registry identifier of a prescription, e.g. `83C40E-A23856-00123C`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PrescriptionId(String);

impl PrescriptionId {
    pub fn new<T: Display>(value: T) -> Result<Self, String> {
        let value = value.to_string();

        if !is_valid(&value) {
            return Err(format!("Invalid prescription id: {}!", value));
        }

        Ok(Self(value))
    }

    pub fn as_string(&self) -> &String {
        &self.0
    }
}

impl Display for PrescriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl Into<String> for PrescriptionId {
    fn into(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PrescriptionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

impl Deref for PrescriptionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn is_valid(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

const MAX_LEN: usize = 64;
