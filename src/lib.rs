pub mod catalog;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod generation;
pub mod models;
pub mod profile;
pub mod prompts;
pub mod saved;
pub mod session;
pub mod store;
pub mod transport;

use std::sync::Arc;

use crate::catalog::TipCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::generation::{GeminiTipGenerator, TipGenerator};
use crate::models::{DetailedTip, Profile, ProfileInput, SavedTip, Tip};
use crate::profile::ProfileStore;
use crate::saved::{SavedTipsStore, ToggleOutcome};
use crate::session::SessionController;
use crate::store::{KeyValueStore, PersistOutcome, StoreKeys};
use crate::transport::{GeminiTransport, Transport};

/// Wires the store, generation client, catalog and session controller
/// together from one `Config`.
pub struct WellnessService {
    profiles: ProfileStore,
    generator: Arc<dyn TipGenerator>,
    catalog: Arc<TipCatalog>,
    session: Arc<SessionController>,
}

impl WellnessService {
    pub async fn new(cfg: &Config) -> Result<Self> {
        if !cfg.has_api_key() {
            tracing::warn!(
                "No generation API key configured; generated tips will use fallback content"
            );
        }

        let store = store::build_store(cfg).await?;

        let transport = Arc::new(GeminiTransport::new(
            cfg.gemini.api_url.clone(),
            cfg.gemini.api_key.clone(),
            cfg.get_request_timeout(),
        )?);
        let generator = Arc::new(GeminiTipGenerator::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            cfg.gemini.max_tips,
        ));

        let catalog = match TipCatalog::load(&cfg.catalog.path).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(
                    "Catalog at {} unavailable, quick tips disabled: {}",
                    cfg.catalog.path.display(),
                    e
                );
                TipCatalog::default()
            }
        };

        Ok(Self::from_parts(
            store,
            generator,
            catalog,
            &StoreKeys::new(cfg.app.namespace.clone()),
        ))
    }

    /// Assemble a service from already-built components.
    pub fn from_parts(
        store: Arc<dyn KeyValueStore>,
        generator: Arc<dyn TipGenerator>,
        catalog: TipCatalog,
        keys: &StoreKeys,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let session = SessionController::new(
            ProfileStore::new(Arc::clone(&store), keys),
            SavedTipsStore::new(Arc::clone(&store), keys),
            Arc::clone(&generator),
            Arc::clone(&catalog),
        );

        Self {
            profiles: ProfileStore::new(store, keys),
            generator,
            catalog,
            session: Arc::new(session),
        }
    }

    pub fn session(&self) -> Arc<SessionController> {
        Arc::clone(&self.session)
    }

    pub fn validate_profile(&self, input: &ProfileInput) -> Result<Profile> {
        ProfileStore::validate(input)
    }

    pub async fn persist_profile(&self, profile: &Profile) -> PersistOutcome {
        self.profiles.persist(profile).await
    }

    pub async fn load_profile(&self) -> Option<Profile> {
        self.profiles.load().await
    }

    pub fn filter_local_tips(&self, goal: &str) -> Result<Vec<Tip>> {
        catalog::filter_by_category(&self.catalog, goal)
    }

    pub async fn generate_tips(&self, profile: &Profile) -> Vec<Tip> {
        self.generator.generate_tips(profile).await
    }

    pub async fn generate_detail(&self, tip: &Tip, profile: &Profile) -> DetailedTip {
        self.generator.generate_detail(tip, profile).await
    }

    pub async fn toggle_saved(&self, tip: &Tip) -> ToggleOutcome {
        self.session.toggle_saved(tip).await
    }

    pub async fn is_saved(&self, tip: &Tip) -> bool {
        self.session.is_saved(tip).await
    }

    pub async fn load_saved_tips(&self) -> Vec<SavedTip> {
        self.session.load_saved().await
    }
}
