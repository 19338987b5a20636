use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};

use crate::catalog::{self, TipCatalog};
use crate::error::{Result, WellnessError};
use crate::generation::TipGenerator;
use crate::models::{DetailedTip, Profile, ProfileInput, SavedTip, Tip};
use crate::profile::ProfileStore;
use crate::saved::{SavedTipsStore, ToggleOutcome};
use crate::store::PersistOutcome;

/// Which entry path a submitted profile takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFlow {
    /// Local catalog filtered by goal. No network.
    QuickTips,
    /// Model-backed generation with fallback.
    Generated,
}

/// Whether a completed request was applied to the session or superseded by
/// a later one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<T> {
    Current(T),
    Stale,
}

impl<T> Applied<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    pub fn current(self) -> Option<T> {
        match self {
            Self::Current(value) => Some(value),
            Self::Stale => None,
        }
    }
}

/// Everything a view renders for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub profile: Option<Profile>,
    pub tips: Vec<Tip>,
    pub selected: Option<Tip>,
    pub detail: Option<DetailedTip>,
}

/// What `restore` found in the durable store.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub profile: Option<Profile>,
    pub saved: usize,
}

/// Orchestrates one user session: profile entry, tip generation, detail
/// fetching and the saved set.
///
/// Tip-set requests and detail requests each draw from their own monotonic
/// token. A completion is applied only if its token is still the latest one
/// issued, so an older request finishing last never overwrites a newer one.
pub struct SessionController {
    profiles: ProfileStore,
    saved: Mutex<SavedTipsStore>,
    generator: Arc<dyn TipGenerator>,
    catalog: Arc<TipCatalog>,
    state: RwLock<SessionState>,
    tips_token: AtomicU64,
    detail_token: AtomicU64,
}

impl SessionController {
    pub fn new(
        profiles: ProfileStore,
        saved: SavedTipsStore,
        generator: Arc<dyn TipGenerator>,
        catalog: Arc<TipCatalog>,
    ) -> Self {
        Self {
            profiles,
            saved: Mutex::new(saved),
            generator,
            catalog,
            state: RwLock::new(SessionState::default()),
            tips_token: AtomicU64::new(0),
            detail_token: AtomicU64::new(0),
        }
    }

    /// Load the persisted profile and saved tips.
    pub async fn restore(&self) -> Restored {
        let (profile, saved) = futures::join!(self.profiles.load(), async {
            self.saved.lock().await.load().await.len()
        });

        if let Some(profile) = &profile {
            tracing::info!("Restored profile with goal '{}'", profile.goal);
            self.state.write().await.profile = Some(profile.clone());
        }

        Restored { profile, saved }
    }

    /// Validate and persist the profile, then produce a fresh tip set through
    /// the chosen flow. Validation and `NoMatch` errors are returned; nothing
    /// else is.
    pub async fn submit_profile(
        &self,
        input: &ProfileInput,
        flow: EntryFlow,
    ) -> Result<Applied<Vec<Tip>>> {
        let profile = ProfileStore::validate(input)?;
        let token = self.next_tips_token();

        if let PersistOutcome::Failed(reason) = self.profiles.persist(&profile).await {
            tracing::warn!("Continuing with unsaved profile: {}", reason);
        }
        {
            // A new profile starts a fresh view; outstanding detail requests become stale
            self.detail_token.fetch_add(1, Ordering::SeqCst);
            let mut state = self.state.write().await;
            state.profile = Some(profile.clone());
            state.selected = None;
            state.detail = None;
        }

        let tips = match flow {
            EntryFlow::QuickTips => catalog::filter_by_category(&self.catalog, &profile.goal)?,
            EntryFlow::Generated => self.generator.generate_tips(&profile).await,
        };
        Ok(self.apply_tips(token, tips).await)
    }

    /// Generate a new set for the current profile, replacing the old one.
    /// The selected tip and its detail are kept.
    pub async fn regenerate(&self) -> Result<Applied<Vec<Tip>>> {
        let profile = self
            .profile()
            .await
            .ok_or_else(|| WellnessError::Validation("missing field: profile".to_string()))?;
        let token = self.next_tips_token();

        let tips = self.generator.generate_tips(&profile).await;
        Ok(self.apply_tips(token, tips).await)
    }

    /// Select a tip and fetch its detail.
    pub async fn select_tip(&self, tip: &Tip) -> Result<Applied<DetailedTip>> {
        let token = self.detail_token.fetch_add(1, Ordering::SeqCst) + 1;
        let profile = {
            let mut state = self.state.write().await;
            let profile = state
                .profile
                .clone()
                .ok_or_else(|| WellnessError::Validation("missing field: profile".to_string()))?;
            state.selected = Some(tip.clone());
            state.detail = None;
            profile
        };

        let detail = self.generator.generate_detail(tip, &profile).await;

        let mut state = self.state.write().await;
        if self.detail_token.load(Ordering::SeqCst) != token {
            tracing::debug!("Discarding stale detail for tip '{}'", tip.id);
            return Ok(Applied::Stale);
        }
        state.detail = Some(detail.clone());
        Ok(Applied::Current(detail))
    }

    pub async fn clear_selection(&self) {
        // Outstanding detail requests become stale
        self.detail_token.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        state.selected = None;
        state.detail = None;
    }

    pub async fn toggle_saved(&self, tip: &Tip) -> ToggleOutcome {
        self.saved.lock().await.toggle(tip).await
    }

    pub async fn is_saved(&self, tip: &Tip) -> bool {
        self.saved.lock().await.is_saved(tip)
    }

    pub async fn saved_tips(&self) -> Vec<SavedTip> {
        self.saved.lock().await.list().to_vec()
    }

    /// Re-read the saved set from the durable store.
    pub async fn load_saved(&self) -> Vec<SavedTip> {
        self.saved.lock().await.load().await.to_vec()
    }

    pub async fn clear_saved(&self) -> PersistOutcome {
        self.saved.lock().await.clear().await
    }

    /// Look a tip up by id in the generated set, then the selected tip, then
    /// the saved set.
    pub async fn find_tip(&self, id: &str) -> Option<Tip> {
        {
            let state = self.state.read().await;
            let mut current = state.tips.iter().chain(state.selected.iter());
            if let Some(tip) = current.find(|t| t.id == id) {
                return Some(tip.clone());
            }
        }
        self.saved.lock().await.get(id).map(|s| s.tip.clone())
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn profile(&self) -> Option<Profile> {
        self.state.read().await.profile.clone()
    }

    pub async fn tips(&self) -> Vec<Tip> {
        self.state.read().await.tips.clone()
    }

    pub async fn selected(&self) -> Option<Tip> {
        self.state.read().await.selected.clone()
    }

    pub async fn detail(&self) -> Option<DetailedTip> {
        self.state.read().await.detail.clone()
    }

    fn next_tips_token(&self) -> u64 {
        self.tips_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn apply_tips(&self, token: u64, tips: Vec<Tip>) -> Applied<Vec<Tip>> {
        let mut state = self.state.write().await;
        if self.tips_token.load(Ordering::SeqCst) != token {
            tracing::debug!("Discarding stale tip set (token {})", token);
            return Applied::Stale;
        }

        tracing::info!("Applied tip set of {}", tips.len());
        state.tips = tips.clone();
        Applied::Current(tips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::{fallback_detail, fallback_tips};
    use crate::generation::{Generated, TipSource};
    use crate::models::{Category, Intensity};
    use crate::store::{KeyValueStore, MemoryStore, StoreKeys};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    // Deterministic generator whose first call can be held open by a gate
    struct GatedGenerator {
        gate: std::sync::Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl GatedGenerator {
        fn open() -> Self {
            Self {
                gate: std::sync::Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }

        fn gated(rx: oneshot::Receiver<()>) -> Self {
            Self {
                gate: std::sync::Mutex::new(Some(rx)),
                calls: AtomicUsize::new(0),
            }
        }

        async fn pass_gate(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().expect("mutex").take();
            if let Some(rx) = gate {
                let _ = rx.await;
            }
        }
    }

    #[async_trait]
    impl TipGenerator for GatedGenerator {
        async fn generate_tips_traced(&self, profile: &Profile) -> Generated<Vec<Tip>> {
            self.pass_gate().await;
            Generated {
                value: fallback_tips(profile),
                source: TipSource::Model,
            }
        }

        async fn generate_detail_traced(
            &self,
            tip: &Tip,
            profile: &Profile,
        ) -> Generated<DetailedTip> {
            self.pass_gate().await;
            Generated {
                value: fallback_detail(tip, profile),
                source: TipSource::Model,
            }
        }
    }

    fn catalog_tip(id: &str, category: &str) -> Tip {
        Tip {
            id: id.to_string(),
            title: format!("Catalog {id}"),
            icon: "🌙".to_string(),
            category: Category::from(category.to_string()),
            short_desc: "short".to_string(),
            long_desc: "long".to_string(),
            steps: vec!["step".to_string()],
            duration: "5 minutes".to_string(),
            intensity: Intensity::Low,
            benefits: vec!["rest".to_string()],
        }
    }

    fn controller_with(
        generator: Arc<dyn TipGenerator>,
        memory: Arc<MemoryStore>,
    ) -> SessionController {
        let keys = StoreKeys::default();
        let catalog = Arc::new(TipCatalog::new(vec![
            catalog_tip("s1", "better sleep"),
            catalog_tip("s2", "better sleep"),
            catalog_tip("f1", "improved focus"),
        ]));
        SessionController::new(
            ProfileStore::new(memory.clone(), &keys),
            SavedTipsStore::new(memory, &keys),
            generator,
            catalog,
        )
    }

    fn controller() -> SessionController {
        controller_with(Arc::new(GatedGenerator::open()), Arc::new(MemoryStore::new()))
    }

    fn input(goal: &str) -> ProfileInput {
        ProfileInput::new("30", "female", goal)
    }

    #[tokio::test]
    async fn test_invalid_profile_is_rejected_without_io() {
        let memory = Arc::new(MemoryStore::new());
        let session = controller_with(Arc::new(GatedGenerator::open()), memory.clone());

        let err = session
            .submit_profile(&input("  "), EntryFlow::Generated)
            .await
            .expect_err("blank goal");
        assert!(matches!(err, WellnessError::Validation(_)));
        assert_eq!(memory.get("userProfile").await.expect("get"), None);
        assert_eq!(session.snapshot().await, SessionState::default());
    }

    #[tokio::test]
    async fn test_generated_flow_persists_and_applies() {
        let memory = Arc::new(MemoryStore::new());
        let session = controller_with(Arc::new(GatedGenerator::open()), memory.clone());

        let applied = session
            .submit_profile(&input(" Weight Loss "), EntryFlow::Generated)
            .await
            .expect("valid profile");
        let tips = applied.current().expect("latest request");
        assert_eq!(tips.len(), 3);
        assert_eq!(session.tips().await, tips);

        let stored = memory.get("userProfile").await.expect("get").expect("persisted");
        assert!(stored.contains("\"goal\":\"weight loss\""));
    }

    #[tokio::test]
    async fn test_quick_tips_flow() {
        let session = controller();

        let tips = session
            .submit_profile(&input("Better Sleep"), EntryFlow::QuickTips)
            .await
            .expect("matches")
            .current()
            .expect("latest request");
        let mut ids: Vec<_> = tips.iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert!(session.selected().await.is_none());

        let err = session
            .submit_profile(&input("muscle gain"), EntryFlow::QuickTips)
            .await
            .expect_err("no catalog entries");
        assert!(matches!(err, WellnessError::NoMatch(_)));
    }

    #[tokio::test]
    async fn test_regenerate_requires_profile() {
        let generator = Arc::new(GatedGenerator::open());
        let session = controller_with(generator.clone(), Arc::new(MemoryStore::new()));

        let err = session.regenerate().await.expect_err("no profile yet");
        assert!(matches!(err, WellnessError::Validation(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);

        session
            .submit_profile(&input("better sleep"), EntryFlow::Generated)
            .await
            .expect("valid");
        let again = session.regenerate().await.expect("profile present");
        assert!(!again.is_stale());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_tip_set_is_discarded() {
        let (release, gate) = oneshot::channel();
        let session = controller_with(
            Arc::new(GatedGenerator::gated(gate)),
            Arc::new(MemoryStore::new()),
        );

        let slow_input = input("weight loss");
        let fast_input = input("better sleep");
        let slow = session.submit_profile(&slow_input, EntryFlow::Generated);
        let fast = async {
            let result = session
                .submit_profile(&fast_input, EntryFlow::Generated)
                .await;
            let _ = release.send(());
            result
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(slow.expect("valid").is_stale());
        let fast = fast.expect("valid").current().expect("latest request");
        assert_eq!(fast.len(), 2);

        // The older, slower response must not overwrite the newer set
        let state = session.snapshot().await;
        assert_eq!(state.tips, fast);
        assert_eq!(state.profile.expect("profile").goal, "better sleep");
    }

    #[tokio::test]
    async fn test_select_tip_stores_detail() {
        let session = controller();
        let tips = session
            .submit_profile(&input("better sleep"), EntryFlow::Generated)
            .await
            .expect("valid")
            .current()
            .expect("latest");

        let detail = session
            .select_tip(&tips[1])
            .await
            .expect("profile present")
            .current()
            .expect("latest");
        assert_eq!(detail.tip, tips[1]);
        assert_eq!(session.selected().await, Some(tips[1].clone()));
        assert_eq!(session.detail().await, Some(detail));

        session.clear_selection().await;
        assert!(session.selected().await.is_none());
        assert!(session.detail().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_detail_is_discarded() {
        let memory = Arc::new(MemoryStore::new());
        let warmup = controller_with(Arc::new(GatedGenerator::open()), memory.clone());
        warmup
            .submit_profile(&input("better sleep"), EntryFlow::Generated)
            .await
            .expect("valid");

        let (release, gate) = oneshot::channel();
        let session = controller_with(Arc::new(GatedGenerator::gated(gate)), memory);
        session.restore().await;

        let profile = session.profile().await.expect("restored");
        let tips = fallback_tips(&profile);
        let first = session.select_tip(&tips[0]);
        let second = async {
            let result = session.select_tip(&tips[1]).await;
            let _ = release.send(());
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.expect("profile").is_stale());
        let detail = second.expect("profile").current().expect("latest");
        assert_eq!(session.detail().await, Some(detail));
        assert_eq!(session.selected().await, Some(tips[1].clone()));
    }

    #[tokio::test]
    async fn test_selection_survives_regenerate() {
        let session = controller();
        let tips = session
            .submit_profile(&input("weight loss"), EntryFlow::Generated)
            .await
            .expect("valid")
            .current()
            .expect("latest");
        let detail = session
            .select_tip(&tips[0])
            .await
            .expect("profile present")
            .current()
            .expect("latest");

        session
            .regenerate()
            .await
            .expect("profile present")
            .current()
            .expect("latest");

        assert_eq!(session.selected().await, Some(tips[0].clone()));
        assert_eq!(session.detail().await, Some(detail));
        assert_eq!(session.find_tip(&tips[0].id).await, Some(tips[0].clone()));
    }

    #[tokio::test]
    async fn test_regenerate_keeps_pending_detail() {
        let memory = Arc::new(MemoryStore::new());
        let warmup = controller_with(Arc::new(GatedGenerator::open()), memory.clone());
        warmup
            .submit_profile(&input("better sleep"), EntryFlow::Generated)
            .await
            .expect("valid");

        let (release, gate) = oneshot::channel();
        let session = controller_with(Arc::new(GatedGenerator::gated(gate)), memory);
        session.restore().await;

        let profile = session.profile().await.expect("restored");
        let tip = fallback_tips(&profile).remove(0);
        let detail = session.select_tip(&tip);
        let regenerate = async {
            let result = session.regenerate().await;
            let _ = release.send(());
            result
        };
        let (detail, regenerated) = tokio::join!(detail, regenerate);

        let tips = regenerated.expect("profile").current().expect("latest");
        assert_eq!(session.tips().await, tips);

        // Only a newer detail request may supersede a detail
        let detail = detail.expect("profile").current().expect("not superseded");
        assert_eq!(detail.tip, tip);
        assert_eq!(session.detail().await, Some(detail));
        assert_eq!(session.selected().await, Some(tip));
    }

    #[tokio::test]
    async fn test_new_profile_clears_selection() {
        let session = controller();
        let tips = session
            .submit_profile(&input("better sleep"), EntryFlow::Generated)
            .await
            .expect("valid")
            .current()
            .expect("latest");
        session.select_tip(&tips[0]).await.expect("profile present");

        session
            .submit_profile(&input("improved focus"), EntryFlow::QuickTips)
            .await
            .expect("valid");
        assert!(session.selected().await.is_none());
        assert!(session.detail().await.is_none());
    }

    #[tokio::test]
    async fn test_restore_and_saved_lookup() {
        let memory = Arc::new(MemoryStore::new());
        let first = controller_with(Arc::new(GatedGenerator::open()), memory.clone());
        let tips = first
            .submit_profile(&input("improved focus"), EntryFlow::QuickTips)
            .await
            .expect("valid")
            .current()
            .expect("latest");
        let outcome = first.toggle_saved(&tips[0]).await;
        assert!(outcome.saved);
        assert!(first.is_saved(&tips[0]).await);

        let second = controller_with(Arc::new(GatedGenerator::open()), memory);
        let restored = second.restore().await;
        assert_eq!(restored.saved, 1);
        assert_eq!(restored.profile.expect("profile").goal, "improved focus");

        // Not in the (empty) generated set, found through the saved set
        assert_eq!(second.find_tip("f1").await, Some(tips[0].clone()));
        assert_eq!(second.find_tip("nope").await, None);

        assert!(second.clear_saved().await.is_written());
        assert!(second.saved_tips().await.is_empty());
    }
}
