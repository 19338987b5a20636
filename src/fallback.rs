//! Deterministic, network-free content used whenever the model path fails.
//! Profile fields only flow into description text, never into selection,
//! except the `weight loss` goal which adds a third tip.

use crate::models::{Category, DetailedTip, Intensity, Profile, Tip};

const WEIGHT_LOSS_GOAL: &str = "weight loss";

const PERSONALIZATION_TIPS: [&str; 3] = [
    "Start with 70% intensity and gradually increase",
    "Combine with your existing routine for better adherence",
    "Track your progress weekly for motivation",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub fn fallback_tips(profile: &Profile) -> Vec<Tip> {
    let mut tips = vec![
        Tip {
            id: "1".to_string(),
            title: "Personalized Morning Routine".to_string(),
            icon: "🌅".to_string(),
            category: Category::General,
            short_desc: "Start your day with energy and purpose".to_string(),
            long_desc: format!(
                "Based on your profile as a {}-year-old {} focusing on {}, this morning routine will set you up for success.",
                profile.age, profile.gender, profile.goal
            ),
            steps: strings(&[
                "Wake up at a consistent time",
                "Drink a glass of water",
                "5 minutes of light stretching",
                "Set 3 daily intentions",
                "Healthy breakfast",
            ]),
            duration: "20 minutes".to_string(),
            intensity: Intensity::Low,
            benefits: strings(&["Increased energy", "Better focus", "Improved mood"]),
        },
        Tip {
            id: "2".to_string(),
            title: "Hydration Strategy".to_string(),
            icon: "💧".to_string(),
            category: Category::Nutrition,
            short_desc: "Stay optimally hydrated throughout the day".to_string(),
            long_desc: format!(
                "Proper hydration is especially important for {}s your age pursuing {}.",
                profile.gender, profile.goal
            ),
            steps: strings(&[
                "Drink water upon waking",
                "Keep water visible",
                "Set hourly reminders",
                "Infuse with natural flavors",
                "Monitor hydration levels",
            ]),
            duration: "Throughout day".to_string(),
            intensity: Intensity::Moderate,
            benefits: strings(&["Better skin", "Improved cognition", "Enhanced digestion"]),
        },
    ];

    if profile.goal == WEIGHT_LOSS_GOAL {
        tips.push(Tip {
            id: "3".to_string(),
            title: "Active Lifestyle Integration".to_string(),
            icon: "🚶".to_string(),
            category: Category::Exercise,
            short_desc: "Incorporate movement into daily activities".to_string(),
            long_desc: "Small changes can lead to significant weight management results."
                .to_string(),
            steps: strings(&[
                "Take stairs instead of elevator",
                "Walk during phone calls",
                "Park further away",
                "Stand up every 30 minutes",
                "Evening walk after dinner",
            ]),
            duration: "Throughout day".to_string(),
            intensity: Intensity::Moderate,
            benefits: strings(&["Calorie burning", "Metabolism boost", "Stress reduction"]),
        });
    }

    tips
}

pub fn fallback_detail(tip: &Tip, profile: &Profile) -> DetailedTip {
    DetailedTip {
        tip: tip.clone(),
        detailed_explanation: format!(
            "Personalized for {}yo {} focusing on {}. {}",
            profile.age, profile.gender, profile.goal, tip.long_desc
        ),
        personalized_tips: strings(&PERSONALIZATION_TIPS),
    }
}
