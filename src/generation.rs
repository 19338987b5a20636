use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::WellnessError;
use crate::extract::{self, PayloadError};
use crate::fallback::{fallback_detail, fallback_tips};
use crate::models::{DetailedTip, GeminiRequest, Profile, Tip};
use crate::prompts;
use crate::transport::Transport;

/// Upper bound on the size of a generated tip set.
pub const MAX_TIPS: usize = 5;

/// Why a generation call used fallback content. Internal only: callers of
/// the plain operations never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    Status(u16),
    Transport(String),
    Body(String),
    MissingText,
    NoJsonSpan,
    Json(String),
    Schema(String),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "endpoint returned status {code}"),
            Self::Transport(e) => write!(f, "request failed: {e}"),
            Self::Body(e) => write!(f, "unreadable response body: {e}"),
            Self::MissingText => f.write_str("response has no candidate text"),
            Self::NoJsonSpan => f.write_str("no JSON object in candidate text"),
            Self::Json(e) => write!(f, "malformed JSON: {e}"),
            Self::Schema(e) => write!(f, "schema mismatch: {e}"),
        }
    }
}

impl From<&WellnessError> for DegradeReason {
    fn from(err: &WellnessError) -> Self {
        match err {
            WellnessError::Upstream { status, .. } => Self::Status(*status),
            WellnessError::Http(e) if e.is_decode() => Self::Body(e.to_string()),
            WellnessError::Json(e) => Self::Body(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<PayloadError> for DegradeReason {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::NoJsonSpan => Self::NoJsonSpan,
            PayloadError::Json(e) => Self::Json(e.to_string()),
            PayloadError::Schema(e) => Self::Schema(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipSource {
    Model,
    Fallback(DegradeReason),
}

/// A generation result together with where its content came from.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub source: TipSource,
}

impl<T> Generated<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, TipSource::Fallback(_))
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Produces tips and tip details. Both operations are total: a failed
/// upstream call is masked by fallback content.
#[async_trait]
pub trait TipGenerator: Send + Sync {
    async fn generate_tips_traced(&self, profile: &Profile) -> Generated<Vec<Tip>>;

    async fn generate_detail_traced(
        &self,
        tip: &Tip,
        profile: &Profile,
    ) -> Generated<DetailedTip>;

    /// 1..=5 tips, in the order the model returned them.
    async fn generate_tips(&self, profile: &Profile) -> Vec<Tip> {
        self.generate_tips_traced(profile).await.into_value()
    }

    async fn generate_detail(&self, tip: &Tip, profile: &Profile) -> DetailedTip {
        self.generate_detail_traced(tip, profile).await.into_value()
    }
}

pub struct GeminiTipGenerator {
    tx: Arc<dyn Transport>,
    max_tips: usize,
}

impl GeminiTipGenerator {
    pub fn new(tx: Arc<dyn Transport>, max_tips: usize) -> Self {
        Self {
            tx,
            max_tips: max_tips.clamp(1, MAX_TIPS),
        }
    }

    /// One request, no retry. Returns the first candidate's text.
    async fn complete(&self, prompt: String) -> Result<String, DegradeReason> {
        let request = GeminiRequest::from_prompt(prompt);
        let response = self
            .tx
            .generate(&request)
            .await
            .map_err(|e| DegradeReason::from(&e))?;

        response
            .first_text()
            .map(str::to_string)
            .ok_or(DegradeReason::MissingText)
    }

    async fn model_tips(&self, profile: &Profile) -> Result<Vec<Tip>, DegradeReason> {
        let text = self
            .complete(prompts::tips_prompt(profile, self.max_tips))
            .await?;
        let mut tips = extract::parse_tips(&text)?;
        tips.truncate(self.max_tips);
        Ok(tips)
    }

    async fn model_detail(
        &self,
        tip: &Tip,
        profile: &Profile,
    ) -> Result<DetailedTip, DegradeReason> {
        let text = self.complete(prompts::detail_prompt(tip, profile)).await?;
        let content = extract::parse_detail(&text)?;
        Ok(DetailedTip {
            tip: tip.clone(),
            detailed_explanation: content.detailed_explanation,
            personalized_tips: content.personalized_tips,
        })
    }
}

#[async_trait]
impl TipGenerator for GeminiTipGenerator {
    async fn generate_tips_traced(&self, profile: &Profile) -> Generated<Vec<Tip>> {
        tracing::info!("Generating tips for goal '{}'", profile.goal);

        match self.model_tips(profile).await {
            Ok(tips) => {
                tracing::info!("Model returned {} usable tip(s)", tips.len());
                Generated {
                    value: tips,
                    source: TipSource::Model,
                }
            }
            Err(reason) => {
                // Fallback sets are returned whole, regardless of max_tips
                tracing::warn!("Tip generation degraded to fallback: {}", reason);
                Generated {
                    value: fallback_tips(profile),
                    source: TipSource::Fallback(reason),
                }
            }
        }
    }

    async fn generate_detail_traced(
        &self,
        tip: &Tip,
        profile: &Profile,
    ) -> Generated<DetailedTip> {
        tracing::info!("Generating detail for tip '{}'", tip.id);

        match self.model_detail(tip, profile).await {
            Ok(detail) => Generated {
                value: detail,
                source: TipSource::Model,
            },
            Err(reason) => {
                tracing::warn!("Detail generation degraded to fallback: {}", reason);
                Generated {
                    value: fallback_detail(tip, profile),
                    source: TipSource::Fallback(reason),
                }
            }
        }
    }
}
