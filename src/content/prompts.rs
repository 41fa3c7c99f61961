//! Prompt templates
//!
//! Each prompt pins the exact JSON shape the parser expects back.

use crate::core::tarot::{DrawnCard, Spread};
use crate::core::zodiac::{compatibility_score, ZodiacSign};

use super::Period;

const SYSTEM_PREAMBLE: &str = "You are a warm, insightful astrologer writing for a consumer app. \
Write in clear English, avoid medical or financial certainty, and answer with JSON only.";

pub fn horoscope(sign: ZodiacSign, period: Period, date: &str) -> String {
    format!(
        "{preamble}\n\n\
         Write a {period} horoscope for {name} ({symbol}, {element} sign ruled by {planet}) starting {date}.\n\
         Typical traits: {traits}.\n\n\
         Respond with exactly this JSON object:\n\
         {{\"summary\": string, \"love\": string, \"career\": string, \"health\": string, \
         \"lucky_numbers\": [up to 3 integers 1-99], \"lucky_color\": string}}",
        preamble = SYSTEM_PREAMBLE,
        period = period.as_str(),
        name = sign.display_name(),
        symbol = sign.symbol(),
        element = sign.element().as_str(),
        planet = sign.ruling_planet(),
        date = date,
        traits = sign.traits().join(", "),
    )
}

pub fn tarot(spread: Spread, question: Option<&str>, cards: &[DrawnCard]) -> String {
    let question = question
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or("General guidance for the days ahead");

    let layout: Vec<String> = cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            format!(
                "{}. {}: {}{} ({})",
                i + 1,
                card.position,
                card.name,
                if card.reversed { " (reversed)" } else { "" },
                card.keywords
            )
        })
        .collect();

    format!(
        "{preamble}\n\n\
         Interpret a {spread} tarot spread.\n\
         Question: {question}\n\
         Cards:\n{layout}\n\n\
         Respond with exactly this JSON object, one entry per card in the same order:\n\
         {{\"cards\": [{{\"position\": string, \"name\": string, \"interpretation\": string}}], \
         \"summary\": string, \"advice\": string}}",
        preamble = SYSTEM_PREAMBLE,
        spread = spread.as_str().replace('_', " "),
        question = question,
        layout = layout.join("\n"),
    )
}

pub fn compatibility(a: ZodiacSign, b: ZodiacSign) -> String {
    format!(
        "{preamble}\n\n\
         Describe the romantic and personal compatibility of {a} ({a_el}, {a_mod}) and {b} ({b_el}, {b_mod}).\n\
         Their element-based baseline score is {score}/100; stay within 10 points of it.\n\n\
         Respond with exactly this JSON object:\n\
         {{\"score\": integer 0-100, \"summary\": string, \"strengths\": [string], \
         \"challenges\": [string], \"advice\": string}}",
        preamble = SYSTEM_PREAMBLE,
        a = a.display_name(),
        a_el = a.element().as_str(),
        a_mod = a.modality().as_str(),
        b = b.display_name(),
        b_el = b.element().as_str(),
        b_mod = b.modality().as_str(),
        score = compatibility_score(a, b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horoscope_prompt_names_sign_and_shape() {
        let prompt = horoscope(ZodiacSign::Leo, Period::Weekly, "2026-10-19");
        assert!(prompt.contains("weekly horoscope for Leo"));
        assert!(prompt.contains("2026-10-19"));
        assert!(prompt.contains("\"lucky_color\""));
    }

    #[test]
    fn test_tarot_prompt_lists_cards() {
        let cards = vec![DrawnCard {
            position: "Guidance".to_string(),
            name: "The Star".to_string(),
            reversed: true,
            keywords: "discouragement".to_string(),
        }];
        let prompt = tarot(Spread::Single, Some("  "), &cards);
        assert!(prompt.contains("1. Guidance: The Star (reversed)"));
        assert!(prompt.contains("General guidance"));
    }

    #[test]
    fn test_compatibility_prompt_carries_score() {
        let prompt = compatibility(ZodiacSign::Aries, ZodiacSign::Leo);
        assert!(prompt.contains("baseline score is 85/100"));
    }
}
