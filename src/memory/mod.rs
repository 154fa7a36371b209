//! Cross-session meeting memory.
//!
//! An append-only, in-process history of completed meetings plus derived
//! owner-load analytics. History lives only as long as the process.
//!
//! `MemoryStore` is the writable handle owned by the orchestrator.
//! `MemoryReader` is a read-only view over the same history, handed to
//! stages and external callers.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::meeting::{ActionItem, MeetingRecord, Metadata};

type History = Arc<RwLock<Vec<MeetingRecord>>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    history: History,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a meeting at the end of history. No dedup, no eviction.
    pub async fn append(
        &self,
        summary: String,
        actions: Vec<ActionItem>,
        metadata: Metadata,
    ) -> Uuid {
        self.append_record(MeetingRecord::new(summary, actions, metadata))
            .await
    }

    pub async fn append_record(&self, record: MeetingRecord) -> Uuid {
        let id = record.id;
        let mut history = self.history.write().await;
        history.push(record);
        debug!("Stored meeting {} ({} in history)", id, history.len());
        id
    }

    pub fn reader(&self) -> MemoryReader {
        MemoryReader {
            history: self.history.clone(),
        }
    }

    pub async fn get_all_meetings(&self) -> Vec<MeetingRecord> {
        self.reader().get_all_meetings().await
    }

    pub async fn compute_owner_stats(&self) -> OwnerStats {
        self.reader().compute_owner_stats().await
    }

    pub async fn total_actions(&self) -> usize {
        self.reader().total_actions().await
    }

    pub async fn len(&self) -> usize {
        self.reader().len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Read-only view of a `MemoryStore`.
#[derive(Clone)]
pub struct MemoryReader {
    history: History,
}

impl MemoryReader {
    /// Snapshot of the full history, oldest first. Owned by the caller.
    pub async fn get_all_meetings(&self) -> Vec<MeetingRecord> {
        self.history.read().await.clone()
    }

    /// Action count per owner across all meetings, recomputed on every call.
    pub async fn compute_owner_stats(&self) -> OwnerStats {
        let history = self.history.read().await;
        OwnerStats::from_actions(history.iter().flat_map(|record| record.actions.iter()))
    }

    pub async fn total_actions(&self) -> usize {
        self.history
            .read()
            .await
            .iter()
            .map(|record| record.actions.len())
            .sum()
    }

    pub async fn len(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Number of action items assigned to each owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OwnerStats(BTreeMap<String, usize>);

impl OwnerStats {
    pub fn from_actions<'a>(actions: impl IntoIterator<Item = &'a ActionItem>) -> Self {
        let mut counts = BTreeMap::new();
        for action in actions {
            *counts
                .entry(action.effective_owner().to_string())
                .or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn get(&self, owner: &str) -> usize {
        self.0.get(owner).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(owner, count)| (owner.as_str(), *count))
    }

    /// Owners by descending load, ties broken by name.
    pub fn top_owners(&self, limit: usize) -> Vec<(String, usize)> {
        let mut owners: Vec<(String, usize)> =
            self.0.iter().map(|(o, c)| (o.clone(), *c)).collect();
        owners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        owners.truncate(limit);
        owners
    }

    /// Named owners holding at least `threshold` actions. `UNASSIGNED` is not a person.
    pub fn overloaded(&self, threshold: usize) -> Vec<String> {
        self.0
            .iter()
            .filter(|(owner, count)| {
                owner.as_str() != crate::meeting::UNASSIGNED && **count >= threshold
            })
            .map(|(owner, _)| owner.clone())
            .collect()
    }

    pub fn into_inner(self) -> BTreeMap<String, usize> {
        self.0
    }
}
