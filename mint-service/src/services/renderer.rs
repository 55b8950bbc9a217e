//! Asset rendering: SVG trading card or image-generation prompt.

use crate::models::Creature;
use askama::Template;
use uuid::Uuid;

const DEFAULT_PRIMARY: &str = "#4F46E5";
const DEFAULT_SECONDARY: &str = "#0EA5E9";

/// Gradient colours for a colour scheme.
///
/// Rules apply in order and later ones override single channels: purple
/// replaces both, gold the secondary, black the primary.
pub fn palette(color_scheme: &str) -> (&'static str, &'static str) {
    let scheme = color_scheme.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| scheme.contains(w));

    let (mut primary, mut secondary) = (DEFAULT_PRIMARY, DEFAULT_SECONDARY);
    if has(&["紫", "パープル", "purple"]) {
        (primary, secondary) = ("#7C3AED", "#A78BFA");
    }
    if has(&["金", "ゴールド", "gold"]) {
        secondary = "#F59E0B";
    }
    if has(&["黒", "ブラック", "black"]) {
        primary = "#111827";
    }
    (primary, secondary)
}

/// The fixed-layout 800x420 card. Text fields are HTML-escaped.
#[derive(Template)]
#[template(path = "card.svg", escape = "html")]
struct SvgCard<'a> {
    horse: &'a Creature,
    primary: &'a str,
    secondary: &'a str,
    short_token: &'a str,
}

/// Render the card. Pure: same input, same bytes.
pub fn render_svg(creature: &Creature, token_id: &Uuid) -> Result<String, askama::Error> {
    let (primary, secondary) = palette(&creature.color_scheme);
    let token = token_id.to_string();

    SvgCard {
        horse: creature,
        primary,
        secondary,
        short_token: &token[..8],
    }
    .render()
}

/// Instruction for the image generator.
pub fn image_prompt(creature: &Creature) -> String {
    format!(
        "A fantasy racehorse trading-card illustration. \
         The horse is named \"{name}\" and its personality is {temperament}. \
         Use the colour scheme {color_scheme} for its coat and mane. \
         Show speed {speed}/10, stamina {stamina}/10 and skill {skill}/10 through its build and pose. \
         Mood hint: \"{catchphrase}\". \
         Dynamic composition, vivid lighting, no text or lettering in the image.",
        name = creature.name,
        temperament = creature.temperament,
        color_scheme = creature.color_scheme,
        speed = creature.speed,
        stamina = creature.stamina,
        skill = creature.skill,
        catchphrase = creature.catchphrase,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature(color_scheme: &str) -> Creature {
        Creature {
            color_scheme: color_scheme.to_string(),
            ..Creature::unparsed_fallback()
        }
    }

    #[test]
    fn palette_rules() {
        assert_eq!(palette("青×白"), (DEFAULT_PRIMARY, DEFAULT_SECONDARY));
        assert_eq!(palette("紫"), ("#7C3AED", "#A78BFA"));
        assert_eq!(palette("紫×金"), ("#7C3AED", "#F59E0B"));
        assert_eq!(palette("黒×金"), ("#111827", "#F59E0B"));
        assert_eq!(palette("Black and Gold"), ("#111827", "#F59E0B"));
        assert_eq!(palette("紫×黒"), ("#111827", "#A78BFA"));
    }

    #[test]
    fn palette_accepts_katakana_colour_names() {
        assert_eq!(palette("ゴールド"), (DEFAULT_PRIMARY, "#F59E0B"));
        assert_eq!(palette("パープル"), ("#7C3AED", "#A78BFA"));
        assert_eq!(palette("ブラック×ゴールド"), ("#111827", "#F59E0B"));
    }

    #[test]
    fn svg_is_deterministic() {
        let token = Uuid::new_v4();
        let horse = creature("紫×金");
        assert_eq!(render_svg(&horse, &token).unwrap(), render_svg(&horse, &token).unwrap());
    }

    #[test]
    fn svg_embeds_fields() {
        let token = Uuid::parse_str("0b5d8c2e-1111-4222-8333-444455556666").unwrap();
        let svg = render_svg(&creature("黒"), &token).unwrap();

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains(">NoName</text>"));
        assert!(svg.contains("穏やか / 黒"));
        assert!(svg.contains("S:6  St:6  Sk:6"));
        assert!(svg.contains("「行くぞ！」"));
        assert!(svg.contains("token:0b5d8c2e<"));
        assert!(svg.contains("stop-color=\"#111827\""));
    }

    #[test]
    fn svg_escapes_markup_in_text() {
        let horse = Creature {
            name: "<script>&".to_string(),
            ..Creature::unparsed_fallback()
        };
        let svg = render_svg(&horse, &Uuid::new_v4()).unwrap();
        assert!(svg.contains("&lt;script&gt;&amp;"));
        assert!(!svg.contains("<script>"));
    }

    #[test]
    fn svg_escapes_quotes_in_text() {
        let horse = Creature {
            catchphrase: "\"走れ\" 'now'".to_string(),
            ..Creature::unparsed_fallback()
        };
        let svg = render_svg(&horse, &Uuid::new_v4()).unwrap();
        assert!(svg.contains("&quot;走れ&quot;"));
        assert!(!svg.contains("'now'"));
    }

    #[test]
    fn image_prompt_mentions_persona_and_stats() {
        let prompt = image_prompt(&creature("紫×金"));
        assert!(prompt.contains("\"NoName\""));
        assert!(prompt.contains("紫×金"));
        assert!(prompt.contains("speed 6/10"));
        assert!(prompt.contains("no text"));
    }
}
