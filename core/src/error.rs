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

use std::io::Error as IoError;

use log::SetLoggerError;
use log4rs::config::runtime::ConfigErrors as Log4RsError;
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::{adherence::Error as AdherenceError, client::Error as ClientError,
    validation::Error as ValidationError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("IO Error: {0}")]
    IoError(IoError),

    #[error("Registry Client Error: {0}")]
    ClientError(ClientError),

    #[error("Validation Error: {0}")]
    ValidationError(ValidationError),

    #[error("Adherence Error: {0}")]
    AdherenceError(AdherenceError),

    #[error("Json Error: {0}")]
    JsonError(JsonError),

    #[error("Unable to set logger: {0}")]
    SetLoggerError(SetLoggerError),

    #[error("Unable to setup log4rs: {0}")]
    Log4RsError(Log4RsError),
}

impl From<String> for Error {
    fn from(v: String) -> Self {
        Self::Generic(v)
    }
}

impl From<IoError> for Error {
    fn from(v: IoError) -> Self {
        Self::IoError(v)
    }
}

impl From<ClientError> for Error {
    fn from(v: ClientError) -> Self {
        Self::ClientError(v)
    }
}

impl From<ValidationError> for Error {
    fn from(v: ValidationError) -> Self {
        Self::ValidationError(v)
    }
}

impl From<AdherenceError> for Error {
    fn from(v: AdherenceError) -> Self {
        Self::AdherenceError(v)
    }
}

impl From<JsonError> for Error {
    fn from(v: JsonError) -> Self {
        Self::JsonError(v)
    }
}

impl From<SetLoggerError> for Error {
    fn from(v: SetLoggerError) -> Self {
        Self::SetLoggerError(v)
    }
}

impl From<Log4RsError> for Error {
    fn from(v: Log4RsError) -> Self {
        Self::Log4RsError(v)
    }
}
