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

pub mod allergy;
pub mod contraindication;
pub mod dosage;
pub mod interaction;

/// Dispensing labels carry strength and form ("Warfarin 3mg tablets"); the
/// rule tables key on the bare drug name.
pub(crate) fn normalize(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase()
}
