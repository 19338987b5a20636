use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{SavedTip, Tip};
use crate::store::{KeyValueStore, PersistOutcome, StoreKeys, read_json, write_json};

/// Result of a toggle: the tip's new membership and how the write went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub saved: bool,
    pub persisted: PersistOutcome,
}

/// Bookmarked tips, at most one entry per tip id, kept in insertion order.
/// The whole sequence is written back on every mutation.
pub struct SavedTipsStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    tips: Vec<SavedTip>,
}

impl SavedTipsStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: &StoreKeys) -> Self {
        Self {
            store,
            key: keys.saved_tips(),
            tips: Vec::new(),
        }
    }

    /// Replace the in-memory set with the persisted one. Absent or unreadable
    /// data yields an empty set; duplicate ids keep their first entry.
    pub async fn load(&mut self) -> &[SavedTip] {
        let stored: Vec<SavedTip> = read_json(self.store.as_ref(), &self.key)
            .await
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let before = stored.len();
        self.tips = stored
            .into_iter()
            .filter(|saved| seen.insert(saved.tip.id.clone()))
            .collect();
        if self.tips.len() != before {
            tracing::warn!(
                "Dropped {} duplicate saved tip(s) on load",
                before - self.tips.len()
            );
        }

        tracing::info!("Loaded {} saved tip(s)", self.tips.len());
        &self.tips
    }

    /// Remove the tip if its id is saved, otherwise save it stamped with now.
    pub async fn toggle(&mut self, tip: &Tip) -> ToggleOutcome {
        let saved = match self.tips.iter().position(|s| s.tip.id == tip.id) {
            Some(index) => {
                self.tips.remove(index);
                false
            }
            None => {
                self.tips.push(SavedTip::new(tip.clone()));
                true
            }
        };
        tracing::debug!("Tip '{}' saved={}", tip.id, saved);

        let persisted = self.persist().await;
        ToggleOutcome { saved, persisted }
    }

    pub fn is_saved(&self, tip: &Tip) -> bool {
        self.contains(&tip.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tips.iter().any(|s| s.tip.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&SavedTip> {
        self.tips.iter().find(|s| s.tip.id == id)
    }

    pub fn list(&self) -> &[SavedTip] {
        &self.tips
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub async fn clear(&mut self) -> PersistOutcome {
        self.tips.clear();
        self.persist().await
    }

    async fn persist(&self) -> PersistOutcome {
        write_json(self.store.as_ref(), &self.key, &self.tips).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WellnessError;
    use crate::models::{Category, Intensity};
    use crate::store::{MemoryStore, MockKeyValueStore};

    fn tip(id: &str, title: &str) -> Tip {
        Tip {
            id: id.to_string(),
            title: title.to_string(),
            icon: "⭐".to_string(),
            category: Category::General,
            short_desc: "short".to_string(),
            long_desc: "long".to_string(),
            steps: vec!["one".to_string()],
            duration: "1 minute".to_string(),
            intensity: Intensity::Moderate,
            benefits: vec!["good".to_string()],
        }
    }

    fn ids(store: &SavedTipsStore) -> Vec<String> {
        store.list().iter().map(|s| s.tip.id.clone()).collect()
    }

    fn saved_store() -> (SavedTipsStore, Arc<MemoryStore>) {
        let memory = Arc::new(MemoryStore::new());
        (
            SavedTipsStore::new(memory.clone(), &StoreKeys::default()),
            memory,
        )
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let (mut store, _) = saved_store();
        let t = tip("1", "One");

        let first = store.toggle(&t).await;
        assert!(first.saved);
        assert!(first.persisted.is_written());
        assert!(store.is_saved(&t));

        let second = store.toggle(&t).await;
        assert!(!second.saved);
        assert!(!store.is_saved(&t));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_double_toggle_restores_membership() {
        let (mut store, _) = saved_store();
        for id in ["a", "b", "c"] {
            store.toggle(&tip(id, id)).await;
        }
        let mut before = ids(&store);
        before.sort();

        // Present tip and absent tip
        for t in [tip("b", "b"), tip("z", "z")] {
            store.toggle(&t).await;
            store.toggle(&t).await;
            let mut after = ids(&store);
            after.sort();
            assert_eq!(after, before);
        }
    }

    #[tokio::test]
    async fn test_membership_is_by_id_only() {
        let (mut store, _) = saved_store();
        store.toggle(&tip("1", "Original")).await;

        let edited = tip("1", "Edited title");
        assert!(store.is_saved(&edited));

        // Toggling the edited copy removes the saved one rather than duplicating it
        let outcome = store.toggle(&edited).await;
        assert!(!outcome.saved);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_no_duplicates_after_toggle_sequence() {
        let (mut store, _) = saved_store();
        let sequence = ["1", "2", "1", "3", "2", "2", "1", "3", "3", "4"];
        for id in sequence {
            store.toggle(&tip(id, id)).await;
            let all = ids(&store);
            let unique: HashSet<_> = all.iter().collect();
            assert_eq!(all.len(), unique.len());
        }
    }

    #[tokio::test]
    async fn test_every_mutation_persists_full_set() {
        let (mut store, memory) = saved_store();
        store.toggle(&tip("1", "One")).await;
        store.toggle(&tip("2", "Two")).await;

        let raw = memory.get("savedTips").await.expect("get").expect("written");
        let persisted: Vec<SavedTip> = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(persisted.len(), 2);

        store.toggle(&tip("1", "One")).await;
        store.toggle(&tip("2", "Two")).await;
        let raw = memory.get("savedTips").await.expect("get").expect("written");
        assert_eq!(raw, "[]");
    }

    #[tokio::test]
    async fn test_load_round_trip_and_dedupe() {
        let (mut store, memory) = saved_store();
        assert!(store.load().await.is_empty());

        store.toggle(&tip("1", "One")).await;
        store.toggle(&tip("2", "Two")).await;

        let mut reloaded = SavedTipsStore::new(memory.clone(), &StoreKeys::default());
        assert_eq!(reloaded.load().await, store.list());

        let dup = serde_json::to_string(&vec![
            SavedTip::new(tip("x", "first")),
            SavedTip::new(tip("x", "second")),
        ])
        .expect("serializes");
        memory.set("savedTips", &dup).await.expect("set");
        let loaded = reloaded.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].tip.title, "first");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_state() {
        let mut mock = MockKeyValueStore::new();
        mock.expect_set()
            .returning(|_, _| Err(WellnessError::Internal("quota exceeded".to_string())));
        let mut store = SavedTipsStore::new(Arc::new(mock), &StoreKeys::default());

        let outcome = store.toggle(&tip("1", "One")).await;
        assert!(outcome.saved);
        assert!(matches!(outcome.persisted, PersistOutcome::Failed(_)));
        assert!(store.contains("1"));
    }
}
