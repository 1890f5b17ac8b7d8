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
use std::fmt::Display;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// ODS organisation code of a dispensing pharmacy, e.g. `FA512`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OdsCode(String);

impl OdsCode {
    pub fn new<T: Display>(value: T) -> Result<Self, String> {
        let value = value.to_string().to_uppercase();

        if !is_valid(&value) {
            return Err(format!("Invalid ODS code: {}!", value));
        }

        Ok(Self(value))
    }

    pub fn as_string(&self) -> &String {
        &self.0
    }
}

impl Into<String> for OdsCode {
    fn into(self) -> String {
        self.0
    }
}

impl TryFrom<String> for OdsCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

impl Deref for OdsCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn is_valid(value: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 8;
