//! Topic detection for specialised system instructions
//!
//! Questions about exercise, nutrition, sleep or stress get an advisor
//! persona tuned to that area; everything else uses the general
//! longevity advisor. All personas share the grounding rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Exercise,
    Nutrition,
    Sleep,
    Stress,
    General,
}

const EXERCISE_KEYWORDS: &[&str] = &["exercise", "workout", "fitness", "training", "physical"];
const NUTRITION_KEYWORDS: &[&str] = &["nutrition", "diet", "food", "eating", "meal", "fasting", "caloric"];
const SLEEP_KEYWORDS: &[&str] = &["sleep", "rest", "circadian", "insomnia"];
const STRESS_KEYWORDS: &[&str] = &["stress", "anxiety", "meditation", "mindfulness"];

const GROUNDING_RULES: &str = "Ground every claim in the numbered context passages. \
Cite the passages you rely on with their bracketed numbers, for example [1] or [1, 3]. \
If the context does not answer the question, say so plainly and answer only from general knowledge, without citations. \
Acknowledge limitations and uncertainty in the evidence, and suggest consulting a healthcare professional for personal medical decisions.";

impl Topic {
    /// First matching topic in a fixed priority order
    pub fn detect(question: &str) -> Topic {
        let lower = question.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if matches(EXERCISE_KEYWORDS) {
            Topic::Exercise
        } else if matches(NUTRITION_KEYWORDS) {
            Topic::Nutrition
        } else if matches(SLEEP_KEYWORDS) {
            Topic::Sleep
        } else if matches(STRESS_KEYWORDS) {
            Topic::Stress
        } else {
            Topic::General
        }
    }

    fn persona(&self) -> &'static str {
        match self {
            Topic::Exercise => "You are a longevity-focused exercise scientist with deep knowledge of how physical activity affects healthspan and lifespan. Focus on evidence-based protocols, age-appropriate modifications and safety considerations.",
            Topic::Nutrition => "You are a longevity-focused nutritionist with expertise in how diet affects healthy ageing and lifespan. Focus on evidence-based dietary strategies, meal timing and individual variation.",
            Topic::Sleep => "You are a sleep researcher focused on how sleep quality, duration and circadian rhythm affect ageing and lifespan.",
            Topic::Stress => "You are a researcher of stress physiology focused on how chronic stress and its management affect ageing and lifespan.",
            Topic::General => "You are an expert longevity advisor with comprehensive knowledge of healthy ageing, exercise science, nutrition, sleep and stress management.",
        }
    }

    /// Full system instruction block for this topic
    pub fn system_instructions(&self) -> String {
        format!("{}\n\n{}", self.persona(), GROUNDING_RULES)
    }
}
