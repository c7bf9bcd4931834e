//! File-based knowledge store of JSON-lines passages for offline use.
//!
//! Each line is `{"store_id": "...", "text": "..."}`. The file is read once on
//! creation; retrieval is delegated to [`InMemoryStore`].
//!
//! Default location: `~/.stratadesk/knowledge.jsonl`

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stratadesk_core::error::RetrievalError;
use stratadesk_core::knowledge::{KnowledgeStore, RawPassage, RetrievalQuery};
use tracing::{debug, warn};

use crate::in_memory::InMemoryStore;

#[derive(Debug, Deserialize)]
struct PassageLine {
    store_id: String,
    text: String,
}

pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl FileStore {
    /// Load passages from `path`.
    ///
    /// A missing file yields an empty store; malformed lines are skipped.
    pub fn new(path: PathBuf) -> Self {
        let passages = Self::load_from_disk(&path);
        let count: usize = passages.values().map(Vec::len).sum();
        debug!(path = %path.display(), count, "Knowledge file loaded");
        Self {
            path,
            inner: InMemoryStore::from_passages(passages),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> HashMap<String, Vec<String>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Knowledge file unreadable, starting empty");
                return HashMap::new();
            }
        };

        let mut passages: HashMap<String, Vec<String>> = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PassageLine>(line) {
                Ok(entry) if !entry.text.trim().is_empty() => {
                    passages.entry(entry.store_id).or_default().push(entry.text);
                }
                Ok(_) => {}
                Err(e) => warn!(line = number + 1, error = %e, "Skipping malformed passage"),
            }
        }
        passages
    }

    /// Sample content written by `stratadesk onboard`.
    pub fn sample_jsonl(building_store: &str, global_store: &str) -> String {
        let lines = [
            (building_store, "Visitor parking is available in bays V1 to V6 for up to four hours. Vehicles staying overnight need a permit from building management."),
            (building_store, "The Annual General Meeting for Building A is held in the ground floor common room. Agenda items must be submitted in writing at least 21 days before the meeting."),
            (building_store, "Residents may keep one small pet with prior written approval of the owners corporation."),
            (global_store, "Levies are issued quarterly. Payment is due 28 days after the notice date."),
            (global_store, "Renovations affecting common property require a by-law approved at a general meeting."),
        ];
        lines
            .iter()
            .filter_map(|(store_id, text)| {
                serde_json::to_string(&serde_json::json!({ "store_id": store_id, "text": text }))
                    .ok()
            })
            .map(|line| line + "\n")
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RawPassage>, RetrievalError> {
        self.inner.retrieve(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn loads_jsonl_and_skips_bad_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"store_id": "kb-a", "text": "Visitor parking is limited to four hours."}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"store_id": "kb-a", "text": "   "}}"#).unwrap();
        writeln!(file, r#"{{"store_id": "kb-g", "text": "Levies are issued quarterly."}}"#).unwrap();

        let store = FileStore::new(file.path().to_path_buf());
        assert_eq!(store.inner.len().await, 2);

        let results = store
            .retrieve(&RetrievalQuery::new("kb-a", "visitor parking", 2))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].text.contains("four hours"));
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.jsonl"));
        assert!(store.inner.is_empty().await);
        let result = store
            .retrieve(&RetrievalQuery::new("kb-a", "parking", 2))
            .await;
        assert!(matches!(result, Err(RetrievalError::StoreNotFound(_))));
    }

    #[tokio::test]
    async fn sample_file_round_trips() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FileStore::sample_jsonl("kb-a", "kb-g").as_bytes())
            .unwrap();

        let store = FileStore::new(file.path().to_path_buf());
        assert_eq!(store.inner.store_ids().await, vec!["kb-a", "kb-g"]);

        let results = store
            .retrieve(&RetrievalQuery::new(
                "kb-a",
                "What's the deadline for submitting agenda items?",
                2,
            ))
            .await
            .unwrap();
        assert!(results[0].text.contains("Agenda items"));
    }
}
