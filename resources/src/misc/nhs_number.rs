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

#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NhsNumber(String);

impl NhsNumber {
    pub fn new<T: Display>(value: T) -> Result<Self, String> {
        let value = value.to_string().replace(' ', "");

        if !is_valid(&value) {
            return Err(format!("Invalid NHS number: {}!", value));
        }

        Ok(Self(value))
    }

    pub fn as_string(&self) -> &String {
        &self.0
    }

    /// Rendering for audit trails: only the last four digits are exposed.
    pub fn masked(&self) -> String {
        format!("******{}", &self.0[NHS_NUMBER_LEN - 4..])
    }
}

impl Into<String> for NhsNumber {
    fn into(self) -> String {
        self.0
    }
}

impl TryFrom<String> for NhsNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }
}

impl Deref for NhsNumber {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn is_valid(value: &str) -> bool {
    if value.len() != NHS_NUMBER_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    // Modulus 11 check digit, weights 10 down to 2 over the first nine digits.
    let sum: usize = value
        .bytes()
        .take(9)
        .enumerate()
        .map(|(i, b)| (10 - i) * (b - b'0') as usize)
        .sum();

    let check = match 11 - sum % 11 {
        11 => 0,
        10 => return false,
        v => v,
    };

    check == (value.as_bytes()[9] - b'0') as usize
}

const NHS_NUMBER_LEN: usize = 10;

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn accepts_valid_check_digit() {
        // 943 476 5919 is the published NHS example number.
        let num = NhsNumber::new("9434765919").unwrap();

        assert_eq!(num.as_string(), "9434765919");
    }

    #[test]
    fn accepts_spaced_form() {
        let num = NhsNumber::new("943 476 5919").unwrap();

        assert_eq!(num.as_string(), "9434765919");
    }

    #[test]
    fn rejects_bad_check_digit() {
        assert!(NhsNumber::new("9434765918").is_err());
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(NhsNumber::new("12345").is_err());
    }

    #[test]
    fn masks_all_but_last_four() {
        let num = NhsNumber::new("9434765919").unwrap();

        assert_eq!(num.masked(), "******5919");
    }
}
