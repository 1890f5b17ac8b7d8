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

use chrono::{DateTime, Utc};
use log::info;

use resources::misc::{NhsNumber, PrescriptionId};

/// Events the notification collaborator renders into SMS/email/whatever.
/// Each carries enough context to build a message without further lookups.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    CriticalValidationIssues {
        patient: NhsNumber,
        prescription: PrescriptionId,
        medications: Vec<String>,
    },
    AdherenceReminderDue {
        patient: NhsNumber,
        medication: String,
        next_due: DateTime<Utc>,
    },
}

/// Delivery is somebody else's problem; the core only fires events. Sinks
/// are constructed explicitly and injected, there is no process-global
/// instance.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::CriticalValidationIssues {
                patient,
                prescription,
                medications,
            } => info!(
                target: "notify",
                "critical validation issues for patient {} (prescription {}): {}",
                patient.masked(),
                prescription,
                medications.join(", "),
            ),
            Notification::AdherenceReminderDue {
                patient,
                medication,
                next_due,
            } => info!(
                target: "notify",
                "adherence reminder due for patient {}: {} was due {}",
                patient.masked(),
                medication,
                next_due,
            ),
        }
    }
}
