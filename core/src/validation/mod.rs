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

pub mod engine;
pub mod remote;
pub mod rules;

pub use engine::{Evaluation, PatientDirectory, StaticPatientDirectory, ValidationEngine};
pub use remote::{HttpModelApi, ModelApi, ModelRequest, ValidationFeedback, ValidationService};

use thiserror::Error;

use crate::client::Error as ClientError;

#[derive(Debug, Error)]
pub enum Error {
    /// Infrastructure failure loading the prescription; propagated.
    #[error("Registry Client Error: {0}")]
    ClientError(ClientError),

    /// A rule check could not reach its data dependency. Absorbed by the
    /// engine: the check contributes no issues and the result is flagged
    /// as degraded.
    #[error("Check dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The optional remote model failed. Absorbed by the merger, which
    /// falls back to the rule-based result.
    #[error("Remote Model Error: {0}")]
    RemoteModel(String),
}

impl From<ClientError> for Error {
    fn from(v: ClientError) -> Self {
        Self::ClientError(v)
    }
}
