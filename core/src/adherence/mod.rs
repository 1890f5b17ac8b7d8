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

pub mod calculator;
pub mod days_supply;

pub use calculator::{AdherenceCalculator, AdherenceStore, InMemoryAdherenceStore};
pub use days_supply::{doses_per_day, estimate};

use thiserror::Error;

use crate::client::Error as ClientError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Registry Client Error: {0}")]
    ClientError(ClientError),
}

impl From<ClientError> for Error {
    fn from(v: ClientError) -> Self {
        Self::ClientError(v)
    }
}
