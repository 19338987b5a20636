use std::sync::Arc;

use crate::error::{Result, WellnessError};
use crate::models::{Profile, ProfileInput};
use crate::store::{KeyValueStore, PersistOutcome, StoreKeys, read_json, write_json};

/// Validates the profile form and keeps the profile in the durable store.
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: &StoreKeys) -> Self {
        Self {
            store,
            key: keys.profile(),
        }
    }

    /// Presence check only: age is not range-checked and gender/goal are not
    /// restricted to the form's choices.
    pub fn validate(input: &ProfileInput) -> Result<Profile> {
        let fields = [
            ("age", &input.age),
            ("gender", &input.gender),
            ("goal", &input.goal),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(WellnessError::Validation(format!("missing field: {name}")));
        }

        Ok(Profile {
            age: input.age.trim().to_string(),
            gender: input.gender.trim().to_string(),
            goal: Self::normalize(&input.goal),
        })
    }

    /// Canonical lookup token for a goal: trimmed and lowercased.
    pub fn normalize(goal: &str) -> String {
        goal.trim().to_lowercase()
    }

    pub async fn persist(&self, profile: &Profile) -> PersistOutcome {
        write_json(self.store.as_ref(), &self.key, profile).await
    }

    /// Best-effort load. A stored profile that no longer validates is ignored.
    pub async fn load(&self) -> Option<Profile> {
        let input: ProfileInput = read_json(self.store.as_ref(), &self.key).await?;
        match Self::validate(&input) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Ignoring stored profile: {}", e);
                None
            }
        }
    }
}
