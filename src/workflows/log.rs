//! Workflow log records.
//!
//! One entry per send attempt that reaches the gateway, success or failure;
//! `delivered` records what the gateway reported. Early exits (empty
//! recipient, quota) are never logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::DispatchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLogEntry {
    pub workflow_id: Uuid,
    pub event_key: String,
    pub driver: String,
    pub timestamp: DateTime<Utc>,
    pub data: LogData,
}

/// The rendered message as it went to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogData {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
    pub delivered: bool,
}

#[cfg_attr(test, mockall::automock)]
pub trait WorkflowLogStore: Send + Sync {
    fn insert(&self, entry: WorkflowLogEntry) -> Result<(), DispatchError>;
}

/// In-memory log store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<WorkflowLogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<WorkflowLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl WorkflowLogStore for MemoryLogStore {
    fn insert(&self, entry: WorkflowLogEntry) -> Result<(), DispatchError> {
        self.entries
            .lock()
            .map_err(|e| DispatchError::Log(e.to_string()))?
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryLogStore::new();
        store
            .insert(WorkflowLogEntry {
                workflow_id: Uuid::new_v4(),
                event_key: "invoice_ready".to_string(),
                driver: "email".to_string(),
                timestamp: Utc::now(),
                data: LogData {
                    to: "a@example.com".to_string(),
                    subject: "Invoice".to_string(),
                    body: "<p>hi</p>".to_string(),
                    attachments: vec!["/tmp/invoice.pdf".to_string()],
                    delivered: true,
                },
            })
            .unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data.to, "a@example.com");
        assert!(entries[0].data.delivered);
    }
}
