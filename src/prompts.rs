use crate::models::{Profile, Tip};

pub const SYSTEM_PROMPT: &str = r#"You are a wellness expert AI that generates personalized health recommendations.
Always respond with valid JSON in this exact format:

For generating tips:
{
  "tips": [
    {
      "id": "unique_id_1",
      "title": "Tip Title",
      "icon": "relevant_emoji",
      "category": "exercise|nutrition|sleep|mental|general",
      "shortDesc": "Brief description",
      "longDesc": "Detailed explanation",
      "steps": ["Step 1", "Step 2", "Step 3"],
      "duration": "e.g., 10 minutes",
      "intensity": "Low|Moderate|High",
      "benefits": ["Benefit 1", "Benefit 2", "Benefit 3"]
    }
  ]
}

For detailed explanations:
{
  "detailedExplanation": "Extended personalized explanation",
  "personalizedTips": ["Tip 1", "Tip 2", "Tip 3"]
}

Make tips practical, evidence-based, and personalized to the user's age, gender, and goals."#;

fn profile_block(profile: &Profile) -> String {
    format!(
        "- Age: {}\n- Gender: {}\n- Goal: {}",
        profile.age, profile.gender, profile.goal
    )
}

pub fn tips_prompt(profile: &Profile, count: usize) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nGenerate {count} personalized wellness tips for:\n{}\n\nMake the tips diverse across different categories and truly personalized.",
        profile_block(profile)
    )
}

pub fn detail_prompt(tip: &Tip, profile: &Profile) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nCreate a detailed explanation for this wellness tip:\nTitle: {}\nCategory: {}\n\nPersonalize it for:\n{}\n\nProvide a detailed explanation and 3 personalized implementation tips.",
        tip.title,
        tip.category,
        profile_block(profile)
    )
}
