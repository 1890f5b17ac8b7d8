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

use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError;

use resources::prescription::Status;

#[derive(Debug, Error)]
pub enum Error {
    /// The credential exchange itself failed. Never retried here.
    #[error("Authentication Error: {0}")]
    Authentication(String),

    /// Terminal registry failure, after retries were exhausted for a
    /// retryable status or immediately for anything else.
    #[error("Registry Error: status={status_code}, retryable={retryable}, attempts={attempts}")]
    Registry {
        status_code: u16,
        retryable: bool,
        attempts: u32,
    },

    #[error("Invalid Status Transition: {from} -> {to}")]
    InvalidStatusTransition { from: Status, to: Status },

    #[error("Http Error: {0}")]
    HttpError(ReqwestError),

    #[error("Json Error: {0}")]
    JsonError(JsonError),

    #[error("Url Parse Error: {0}")]
    ParseError(ParseError),
}

impl From<ReqwestError> for Error {
    fn from(v: ReqwestError) -> Self {
        Self::HttpError(v)
    }
}

impl From<JsonError> for Error {
    fn from(v: JsonError) -> Self {
        Self::JsonError(v)
    }
}

impl From<ParseError> for Error {
    fn from(v: ParseError) -> Self {
        Self::ParseError(v)
    }
}
