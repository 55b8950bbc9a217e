//! Quiz answers as submitted by the form or an API caller.

use serde_json::Value;
use std::collections::HashMap;

/// The five answers of a quiz submission. Every answer is optional; a
/// missing answer is treated the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizAnswers {
    /// Intuition vs. planning.
    pub q1: Option<String>,
    /// Team vs. solo.
    pub q2: Option<String>,
    /// Morning vs. night.
    pub q3: Option<String>,
    /// Favourite field, drives the stat boost.
    pub q4: Option<String>,
    /// Favourite colour, free text.
    pub q5: Option<String>,
}

/// Stat that a recognized q4 answer boosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Speed,
    Stamina,
    Skill,
}

impl Focus {
    /// Keyword table checked in order; first hit wins.
    const KEYWORDS: &'static [(Focus, &'static [&'static str])] = &[
        (Focus::Speed, &["スピード", "素早", "speed"]),
        (Focus::Stamina, &["スタミナ", "粘り", "stamina"]),
        (Focus::Skill, &["知性", "戦略", "skill", "intellect"]),
    ];

    /// Match a free-text answer against the focus keywords.
    pub fn from_answer(answer: &str) -> Option<Self> {
        let lowered = answer.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(w)))
            .map(|(focus, _)| *focus)
    }
}

impl QuizAnswers {
    /// Build answers from a decoded JSON body.
    ///
    /// Keys match case-insensitively. Strings are kept verbatim, numbers and
    /// booleans are stringified, anything else counts as missing. A body that
    /// is not an object yields no answers.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut answers = Self::default();
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            answers.set(key, text);
        }
        answers
    }

    /// Build answers from decoded form fields.
    pub fn from_form(fields: HashMap<String, String>) -> Self {
        let mut answers = Self::default();
        for (key, value) in fields {
            answers.set(&key, value);
        }
        answers
    }

    fn set(&mut self, key: &str, value: String) {
        let slot = match key.to_ascii_lowercase().as_str() {
            "q1" => &mut self.q1,
            "q2" => &mut self.q2,
            "q3" => &mut self.q3,
            "q4" => &mut self.q4,
            "q5" => &mut self.q5,
            _ => return,
        };
        *slot = Some(value);
    }

    /// The recognized focus of q4, if any.
    pub fn focus(&self) -> Option<Focus> {
        self.q4.as_deref().and_then(Focus::from_answer)
    }

    /// One-line profile summary handed to the text generator.
    pub fn profile_summary(&self) -> String {
        let get = |a: &Option<String>| a.as_deref().unwrap_or("").to_string();
        format!(
            "Q1:{}, Q2:{}, Q3:{}, Q4:{}, Q5(色):{}",
            get(&self.q1),
            get(&self.q2),
            get(&self.q3),
            get(&self.q4),
            get(&self.q5)
        )
    }
}
