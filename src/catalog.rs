//! Local quick-tips path over the seed dataset. No network involved.

use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Result, WellnessError};
use crate::models::Tip;
use crate::profile::ProfileStore;

/// Read-only seed dataset of category-tagged tips.
#[derive(Debug, Clone, Default)]
pub struct TipCatalog {
    tips: Vec<Tip>,
}

impl TipCatalog {
    pub fn new(tips: Vec<Tip>) -> Self {
        Self { tips }
    }

    /// Parse a JSON array of tips.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let tips: Vec<Tip> = serde_json::from_str(raw)?;
        Ok(Self { tips })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            "Loaded {} catalog tips from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn tips(&self) -> &[Tip] {
        &self.tips
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }
}

/// Entries whose category equals the normalized goal, uniformly shuffled.
///
/// Fails with `NoMatch` when nothing matches. The order is random on every
/// call; callers must not rely on it.
pub fn filter_by_category(catalog: &TipCatalog, goal: &str) -> Result<Vec<Tip>> {
    filter_by_category_with_rng(catalog, goal, &mut rand::thread_rng())
}

pub fn filter_by_category_with_rng<R: Rng + ?Sized>(
    catalog: &TipCatalog,
    goal: &str,
    rng: &mut R,
) -> Result<Vec<Tip>> {
    let goal = ProfileStore::normalize(goal);
    let mut matched: Vec<Tip> = catalog
        .tips
        .iter()
        .filter(|tip| tip.category.matches(&goal))
        .cloned()
        .collect();

    if matched.is_empty() {
        return Err(WellnessError::NoMatch(goal));
    }

    // Fisher-Yates
    matched.shuffle(rng);
    Ok(matched)
}
