use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender choices offered by the profile form.
pub const GENDERS: [&str; 4] = ["male", "female", "non binary", "prefer not to say"];

/// Goal choices offered by the profile form, already in canonical form.
pub const GOALS: [&str; 6] = [
    "weight loss",
    "muscle gain",
    "stress reduction",
    "better sleep",
    "improved focus",
    "general wellness",
];

/// Raw profile form input. Any field may be blank.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProfileInput {
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub goal: String,
}

impl ProfileInput {
    pub fn new(
        age: impl Into<String>,
        gender: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            age: age.into(),
            gender: gender.into(),
            goal: goal.into(),
        }
    }
}

/// Validated user profile. Only built through `ProfileStore::validate`,
/// so every field is non-blank and `goal` is normalized.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    pub age: String,
    pub gender: String,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Exercise,
    Nutrition,
    Sleep,
    Mental,
    General,
    /// Catalog-only tag such as a goal token ("better sleep").
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exercise => "exercise",
            Self::Nutrition => "nutrition",
            Self::Sleep => "sleep",
            Self::Mental => "mental",
            Self::General => "general",
            Self::Other(token) => token,
        }
    }

    /// One of the five categories a generated tip may carry.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Case-insensitive comparison against a goal token.
    pub fn matches(&self, goal: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(goal.trim())
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        let token = raw.trim().to_lowercase();
        match token.as_str() {
            "exercise" => Self::Exercise,
            "nutrition" => Self::Nutrition,
            "sleep" => Self::Sleep,
            "mental" => Self::Mental,
            "general" => Self::General,
            _ => Self::Other(token),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// A structured wellness recommendation. Every field is required on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub category: Category,
    pub short_desc: String,
    pub long_desc: String,
    pub steps: Vec<String>,
    pub duration: String,
    pub intensity: Intensity,
    pub benefits: Vec<String>,
}

/// Bookmarked tip as persisted: the tip fields plus `savedAt`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedTip {
    #[serde(flatten)]
    pub tip: Tip,
    pub saved_at: DateTime<Utc>,
}

impl SavedTip {
    pub fn new(tip: Tip) -> Self {
        Self {
            tip,
            saved_at: Utc::now(),
        }
    }
}

/// A tip with its personalized long-form explanation. Never persisted as such.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetailedTip {
    #[serde(flatten)]
    pub tip: Tip,
    pub detailed_explanation: String,
    pub personalized_tips: Vec<String>,
}

// Gemini generateContent request format
#[derive(Debug, Serialize, Clone)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(prompt.into()),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// Gemini generateContent response format. Everything is optional so a
// structurally odd body still deserializes and is rejected later.
#[derive(Debug, Deserialize, Default)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

impl GeminiResponse {
    /// `candidates[0].content.parts[0].text`, if present.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}
