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

pub mod adherence;
pub mod misc;
pub mod patient;
pub mod prescription;
pub mod validation;

pub use adherence::{AdherenceRecord, AdherenceStatus, MedicationAdherence, Trend};
pub use patient::PatientContext;
pub use prescription::{DosageInstruction, MedicationReference, Prescription, Status};
pub use validation::{IssueType, Severity, ValidationIssue, ValidationResult};
