use crate::persist::{PersistedList, StoreState};
use crate::storage::KeyValueStore;
use std::sync::Arc;

pub const HISTORY_KEY: &str = "weather.search_history";

/// Maximum number of remembered selections
pub const HISTORY_LIMIT: usize = 10;

/// Most-recent-first log of selected labels
pub struct HistoryStore {
    list: PersistedList<String>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            list: PersistedList::new(HISTORY_KEY, store, normalize),
        }
    }

    pub async fn load(&self) {
        self.list.load().await;
    }

    pub fn state(&self) -> StoreState {
        self.list.state()
    }

    /// Move `label` to the front, dropping any older copy and the overflow
    pub fn record(&self, label: &str) {
        let label = label.to_string();
        self.list.update(move |entries| {
            entries.retain(|e| *e != label);
            entries.insert(0, label);
            entries.truncate(HISTORY_LIMIT);
        });
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.list.snapshot()
    }

    pub fn entries_len(&self) -> usize {
        self.list.read(<[String]>::len)
    }

    pub async fn flush(&self) {
        self.list.flush().await;
    }
}

fn normalize(entries: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(entries.len());
    entries.retain(|e| {
        if seen.contains(e) {
            false
        } else {
            seen.push(e.clone());
            true
        }
    });
    entries.truncate(HISTORY_LIMIT);
}
