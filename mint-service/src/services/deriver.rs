//! Trait derivation: quiz answers in, creature out.
//!
//! Two variants share one entry point. Without a text provider the mapping
//! is a fixed table; with one, the answers are summarized into a prompt and
//! the generated JSON is read back through a best-effort parser. Either way
//! `TraitDeriver::derive` always yields a creature.

use crate::models::{clamp_stat, Creature, Focus, QuizAnswers, DEFAULT_STAT};
use crate::services::providers::{FinishReason, GenerationParams, TextProvider};
use serde_json::{Map, Value};
use std::num::IntErrorKind;
use std::sync::Arc;

/// Base value of every stat before the focus boost.
pub const BASE_STAT: u8 = 6;

/// Added to the stat picked by the focus answer.
pub const FOCUS_BOOST: i64 = 3;

const TEXT_TEMPERATURE: f32 = 0.7;

/// A creature object is well under this; the cap only stops runaway replies.
pub const TEXT_MAX_TOKENS: i32 = 1024;

#[derive(Clone)]
pub struct TraitDeriver {
    text_provider: Option<Arc<dyn TextProvider>>,
}

impl TraitDeriver {
    pub fn deterministic() -> Self {
        Self {
            text_provider: None,
        }
    }

    pub fn generative(text_provider: Arc<dyn TextProvider>) -> Self {
        Self {
            text_provider: Some(text_provider),
        }
    }

    pub async fn derive(&self, answers: &QuizAnswers) -> Creature {
        let Some(provider) = &self.text_provider else {
            return derive_deterministic(answers);
        };

        let prompt = creature_prompt(&answers.profile_summary());
        match provider.generate(&prompt, &text_params()).await {
            Ok(response) => {
                tracing::debug!(
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    finish_reason = ?response.finish_reason,
                    "Text generation finished"
                );
                match response.finish_reason {
                    FinishReason::Length => {
                        tracing::warn!(
                            max_tokens = TEXT_MAX_TOKENS,
                            "Generated creature hit the token limit and may be cut short"
                        );
                    }
                    FinishReason::Error => {
                        tracing::warn!("Text generation stopped for an unexpected reason");
                    }
                    FinishReason::Complete | FinishReason::ContentFilter => {}
                }
                creature_from_generated(response.text.as_deref().unwrap_or(""))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Text generation failed, using fallback creature");
                Creature::unavailable_fallback()
            }
        }
    }
}

/// One shot, JSON-only output.
pub fn text_params() -> GenerationParams {
    GenerationParams {
        temperature: Some(TEXT_TEMPERATURE),
        max_tokens: Some(TEXT_MAX_TOKENS),
        json_output: true,
    }
}

/// Fixed mapping used when no text provider is configured.
pub fn derive_deterministic(answers: &QuizAnswers) -> Creature {
    let focus = answers.focus();
    let boosted = |stat: Focus| {
        let bonus = if focus == Some(stat) { FOCUS_BOOST } else { 0 };
        clamp_stat(i64::from(BASE_STAT) + bonus)
    };

    Creature {
        name: format!("{} {}", name_prefix(answers.q3.as_deref()), name_suffix(focus)),
        temperament: temperament(answers.q1.as_deref()).to_string(),
        color_scheme: answers
            .q5
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("青×白")
            .to_string(),
        speed: boosted(Focus::Speed),
        stamina: boosted(Focus::Stamina),
        skill: boosted(Focus::Skill),
        catchphrase: catchphrase(answers.q2.as_deref()).to_string(),
    }
}

fn temperament(q1: Option<&str>) -> &'static str {
    match q1.unwrap_or("") {
        a if a.contains("直感") => "直感型",
        a if a.contains("計画") => "計画型",
        a if a.contains("状況") || a.contains("切替") => "柔軟型",
        _ => "Balanced",
    }
}

fn name_prefix(q3: Option<&str>) -> &'static str {
    match q3.unwrap_or("") {
        a if a.contains('朝') => "Dawn",
        a if a.contains('夜') => "Midnight",
        _ => "Twilight",
    }
}

fn name_suffix(focus: Option<Focus>) -> &'static str {
    match focus {
        Some(Focus::Speed) => "Comet",
        Some(Focus::Stamina) => "Oak",
        Some(Focus::Skill) => "Sage",
        None => "Runner",
    }
}

fn catchphrase(q2: Option<&str>) -> &'static str {
    match q2.unwrap_or("") {
        a if a.contains("チーム") => "みんなで行こう！",
        a if a.contains("個人") => "我が道を行く！",
        _ => "行くぞ！",
    }
}

/// Prompt that asks the model for exactly one creature JSON object.
pub fn creature_prompt(profile: &str) -> String {
    format!(
        r#"あなたはファンタジー競走馬のデザイナーです。
以下のユーザーの性格診断の要約を読み、馬の設定を JSON で1つ出力してください。

# 出力 JSON 仕様（必ずこのキーのみ、数値は 1〜10 の整数）
{{
  "name": "短い名前（日本語または英語）",
  "temperament": "性格説明（10〜20文字）",
  "colorScheme": "配色（例: 青×黒 / 紫×金 など）",
  "speed": 7,
  "stamina": 5,
  "skill": 6,
  "catchphrase": "短い決め台詞"
}}

# ユーザー要約:
{profile}
"#
    )
}

/// Read generated text as a creature, falling back to `NoName` when it
/// holds no JSON object.
pub fn creature_from_generated(text: &str) -> Creature {
    extract_creature(text).unwrap_or_else(|| {
        tracing::warn!(text_len = text.len(), "Generated text held no creature object");
        Creature::unparsed_fallback()
    })
}

/// Parse the slice between the first `{` and the last `}` as a creature.
///
/// Returns `None` when there is no such slice or it is not a JSON object.
/// Missing text fields take the `NoName` fallback's values; stats are
/// re-clamped independently.
pub fn extract_creature(text: &str) -> Option<Creature> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let object = value.as_object()?;
    let fallback = Creature::unparsed_fallback();

    Some(Creature {
        name: text_field(object, "name").unwrap_or(fallback.name),
        temperament: text_field(object, "temperament").unwrap_or(fallback.temperament),
        color_scheme: text_field(object, "colorScheme").unwrap_or(fallback.color_scheme),
        speed: coerce_stat(object.get("speed")),
        stamina: coerce_stat(object.get("stamina")),
        skill: coerce_stat(object.get("skill")),
        catchphrase: text_field(object, "catchphrase").unwrap_or(fallback.catchphrase),
    })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Integers clamp, floats truncate then clamp, numeric strings parse then
/// clamp. Everything else is the default stat.
pub fn coerce_stat(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                clamp_stat(i)
            } else if n.as_u64().is_some() {
                clamp_stat(i64::MAX)
            } else {
                n.as_f64()
                    .map(|f| clamp_stat(f.trunc() as i64))
                    .unwrap_or(DEFAULT_STAT)
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => clamp_stat(i),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => clamp_stat(i64::MAX),
                IntErrorKind::NegOverflow => clamp_stat(i64::MIN),
                _ => DEFAULT_STAT,
            },
        },
        _ => DEFAULT_STAT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockTextProvider;
    use serde_json::json;

    fn with_focus(q4: &str) -> QuizAnswers {
        QuizAnswers {
            q4: Some(q4.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn speed_focus_boosts_speed_only() {
        let creature = derive_deterministic(&with_focus("スピード"));
        assert_eq!(creature.stats(), [9, 6, 6]);
        assert_eq!(creature.name, "Twilight Comet");
    }

    #[test]
    fn each_focus_boosts_its_own_stat() {
        assert_eq!(derive_deterministic(&with_focus("スタミナ・粘り強さ")).stats(), [6, 9, 6]);
        assert_eq!(derive_deterministic(&with_focus("知性・戦略性")).stats(), [6, 6, 9]);
    }

    #[test]
    fn unrecognized_focus_keeps_base_mapping() {
        for q4 in ["運の良さ・豪運", "", "???"] {
            assert_eq!(derive_deterministic(&with_focus(q4)).stats(), [6, 6, 6]);
        }
        assert_eq!(derive_deterministic(&QuizAnswers::default()).stats(), [6, 6, 6]);
    }

    #[test]
    fn missing_answers_take_defaults() {
        let creature = derive_deterministic(&QuizAnswers::default());
        assert_eq!(creature.temperament, "Balanced");
        assert_eq!(creature.color_scheme, "青×白");
        assert_eq!(creature.catchphrase, "行くぞ！");
        assert_eq!(creature.name, "Twilight Runner");
    }

    #[test]
    fn answers_shape_the_persona() {
        let creature = derive_deterministic(&QuizAnswers {
            q1: Some("しっかり計画する".into()),
            q2: Some("チーム戦が好き".into()),
            q3: Some("完全に夜型".into()),
            q4: Some("知性・戦略性".into()),
            q5: Some("  紫×金 ".into()),
        });
        assert_eq!(creature.name, "Midnight Sage");
        assert_eq!(creature.temperament, "計画型");
        assert_eq!(creature.color_scheme, "紫×金");
        assert_eq!(creature.catchphrase, "みんなで行こう！");
    }

    #[test]
    fn extracts_object_wrapped_in_prose_and_fences() {
        let text = "Sure!\n```json\n{\"name\":\"Kaze\",\"temperament\":\"冷静\",\"colorScheme\":\"紫×金\",\"speed\":8,\"stamina\":5,\"skill\":7,\"catchphrase\":\"風になれ\"}\n```";
        let creature = extract_creature(text).unwrap();
        assert_eq!(creature.name, "Kaze");
        assert_eq!(creature.color_scheme, "紫×金");
        assert_eq!(creature.stats(), [8, 5, 7]);
    }

    #[test]
    fn stats_are_reclamped_independently() {
        let text = r#"{"speed": 42, "stamina": -3, "skill": "9"}"#;
        let creature = extract_creature(text).unwrap();
        assert_eq!(creature.stats(), [10, 1, 9]);
        assert_eq!(creature.name, "NoName");
    }

    #[test]
    fn coerce_stat_handles_odd_values() {
        assert_eq!(coerce_stat(None), 6);
        assert_eq!(coerce_stat(Some(&json!(null))), 6);
        assert_eq!(coerce_stat(Some(&json!("fast"))), 6);
        assert_eq!(coerce_stat(Some(&json!(true))), 6);
        assert_eq!(coerce_stat(Some(&json!([7]))), 6);
        assert_eq!(coerce_stat(Some(&json!(7.9))), 7);
        assert_eq!(coerce_stat(Some(&json!(0.5))), 1);
        assert_eq!(coerce_stat(Some(&json!(" 4 "))), 4);
        assert_eq!(coerce_stat(Some(&json!(u64::MAX))), 10);
        assert_eq!(coerce_stat(Some(&json!("99999999999999999999999"))), 10);
        assert_eq!(coerce_stat(Some(&json!("-99999999999999999999999"))), 1);
    }

    #[test]
    fn non_object_text_is_rejected() {
        assert_eq!(extract_creature("no braces here"), None);
        assert_eq!(extract_creature("} backwards {"), None);
        assert_eq!(extract_creature("{not json}"), None);
        assert_eq!(creature_from_generated(""), Creature::unparsed_fallback());
    }

    #[test]
    fn stats_stay_in_range_for_arbitrary_numbers() {
        for raw in [i64::MIN, -1, 0, 1, 5, 10, 11, i64::MAX] {
            let text = format!(r#"{{"speed":{raw},"stamina":{raw},"skill":{raw}}}"#);
            let creature = creature_from_generated(&text);
            assert!(creature.stats().iter().all(|s| (1..=10).contains(s)));
        }
    }

    #[tokio::test]
    async fn generative_variant_parses_provider_reply() {
        let provider = Arc::new(MockTextProvider::replying(
            r#"{"name":"Aurora","temperament":"陽気","colorScheme":"金","speed":3,"stamina":11,"skill":6,"catchphrase":"光れ"}"#,
        ));
        let deriver = TraitDeriver::generative(provider.clone());

        let creature = deriver.derive(&QuizAnswers::default()).await;
        assert_eq!(creature.name, "Aurora");
        assert_eq!(creature.stats(), [3, 10, 6]);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn generative_variant_requests_bounded_json() {
        let provider = Arc::new(MockTextProvider::replying("{}"));
        TraitDeriver::generative(provider.clone())
            .derive(&QuizAnswers::default())
            .await;

        let params = provider.last_params().expect("provider was not called");
        assert!(params.json_output);
        assert_eq!(params.max_tokens, Some(TEXT_MAX_TOKENS));
        assert_eq!(params.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn truncated_reply_takes_parse_fallback() {
        let provider = Arc::new(MockTextProvider::truncated(r#"{"name":"Half","speed":"#));
        let creature = TraitDeriver::generative(provider)
            .derive(&QuizAnswers::default())
            .await;
        assert_eq!(creature, Creature::unparsed_fallback());
    }

    #[tokio::test]
    async fn truncated_but_complete_object_is_kept() {
        let provider = Arc::new(MockTextProvider::truncated(r#"{"name":"Whole","speed":8}"#));
        let creature = TraitDeriver::generative(provider)
            .derive(&QuizAnswers::default())
            .await;
        assert_eq!(creature.name, "Whole");
        assert_eq!(creature.speed, 8);
    }

    #[tokio::test]
    async fn generative_variant_survives_provider_failure() {
        let provider = Arc::new(MockTextProvider::failing());
        let deriver = TraitDeriver::generative(provider.clone());

        let creature = deriver.derive(&with_focus("スピード")).await;
        assert_eq!(creature, Creature::unavailable_fallback());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn generative_variant_falls_back_on_garbage() {
        let deriver = TraitDeriver::generative(Arc::new(MockTextProvider::replying("I refuse.")));
        assert_eq!(
            deriver.derive(&QuizAnswers::default()).await,
            Creature::unparsed_fallback()
        );
    }

    #[test]
    fn prompt_embeds_profile() {
        let prompt = creature_prompt("Q1:a, Q2:b");
        assert!(prompt.contains("# ユーザー要約:\nQ1:a, Q2:b"));
        assert!(prompt.contains("\"colorScheme\""));
    }
}
