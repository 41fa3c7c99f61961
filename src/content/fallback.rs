// Canned content built from the sign and deck tables
use crate::core::tarot::{DrawnCard, Spread};
use crate::core::zodiac::{compatibility_score, Element, ZodiacSign};

use super::{CardReading, CompatibilityContent, HoroscopeContent, Period, TarotContent};

const COLORS: [&str; 4] = ["crimson", "emerald", "sky blue", "silver"];

fn element_theme(element: Element) -> &'static str {
    match element {
        Element::Fire => "Your drive burns bright; channel it into one clear goal.",
        Element::Earth => "Steady steps pay off; tend to what you have already planted.",
        Element::Air => "Conversations open doors; share the idea you have been holding back.",
        Element::Water => "Trust your intuition; quiet moments bring the clearest answers.",
    }
}

/// Small stable numbers derived from the sign and date
fn lucky_numbers(sign: ZodiacSign, date: &str) -> Vec<u8> {
    let seed = date
        .bytes()
        .fold(sign as u32 + 1, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    vec![
        (seed % 9 + 1) as u8,
        (seed / 9 % 40 + 10) as u8,
        (seed / 360 % 49 + 50) as u8,
    ]
}

pub fn horoscope(sign: ZodiacSign, period: Period, date: &str) -> HoroscopeContent {
    let traits = sign.traits();
    let element = sign.element();
    HoroscopeContent {
        sign: Some(sign),
        period,
        date: date.to_string(),
        summary: format!(
            "{} {}, your {} nature sets the tone for this {} stretch.",
            element_theme(element),
            sign.display_name(),
            traits.first().copied().unwrap_or("steady"),
            period.as_str()
        ),
        love: format!(
            "Let your {} side show; small gestures matter more than grand ones.",
            traits.get(1).copied().unwrap_or("caring")
        ),
        career: format!(
            "{} supports focused work. Finish one open task before starting another.",
            sign.ruling_planet()
        ),
        health: "Keep a regular rhythm of sleep and movement, and drink enough water.".to_string(),
        lucky_numbers: lucky_numbers(sign, date),
        lucky_color: COLORS[element as usize % COLORS.len()].to_string(),
    }
}

pub fn tarot(spread: Spread, question: Option<&str>, cards: &[DrawnCard]) -> TarotContent {
    let readings: Vec<CardReading> = cards
        .iter()
        .map(|card| CardReading {
            position: card.position.clone(),
            name: card.name.clone(),
            reversed: card.reversed,
            interpretation: format!(
                "In the {} position, {}{} speaks of {}.",
                card.position.to_lowercase(),
                card.name,
                if card.reversed { " reversed" } else { "" },
                card.keywords
            ),
        })
        .collect();

    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    TarotContent {
        spread,
        question: question.map(str::to_string),
        cards: readings,
        summary: format!("The cards drawn were {}.", names.join(", ")),
        advice: "Reflect on the card that stands out most to you and note where it echoes your situation."
            .to_string(),
    }
}

pub fn compatibility(a: ZodiacSign, b: ZodiacSign) -> CompatibilityContent {
    let score = compatibility_score(a, b);
    let (ea, eb) = (a.element(), b.element());

    let summary = if ea == eb {
        format!(
            "{} and {} share the {} element and understand each other instinctively.",
            a.display_name(),
            b.display_name(),
            ea.as_str()
        )
    } else {
        format!(
            "{} ({}) and {} ({}) bring different energies that can balance each other.",
            a.display_name(),
            ea.as_str(),
            b.display_name(),
            eb.as_str()
        )
    };

    CompatibilityContent {
        sign_a: Some(a),
        sign_b: Some(b),
        score: Some(score),
        summary,
        strengths: vec![
            format!("{} brings a {} outlook", a.display_name(), a.traits()[0]),
            format!("{} offers a {} presence", b.display_name(), b.traits()[0]),
        ],
        challenges: vec![format!(
            "{} and {} tendencies may clash under stress",
            a.traits()[2],
            b.traits()[2]
        )],
        advice: "Name your needs plainly and make room for each other's pace.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Complete;

    #[test]
    fn test_fallbacks_are_complete() {
        assert!(horoscope(ZodiacSign::Pisces, Period::Daily, "2026-10-19").is_complete());
        let cards = crate::core::tarot::draw(Spread::ThreeCard, &mut rand::thread_rng());
        let reading = tarot(Spread::ThreeCard, None, &cards);
        assert!(reading.is_complete());
        assert_eq!(reading.cards.len(), 3);
        assert!(compatibility(ZodiacSign::Virgo, ZodiacSign::Taurus).is_complete());
    }

    #[test]
    fn test_horoscope_fallback_is_stable() {
        let a = horoscope(ZodiacSign::Leo, Period::Monthly, "2026-10-01");
        let b = horoscope(ZodiacSign::Leo, Period::Monthly, "2026-10-01");
        assert_eq!(a, b);
        assert!(a.lucky_numbers.iter().all(|n| (1..=99).contains(n)));
    }

    #[test]
    fn test_compatibility_fallback_uses_baseline() {
        let c = compatibility(ZodiacSign::Cancer, ZodiacSign::Scorpio);
        assert_eq!(c.score, Some(85));
        assert!(c.summary.contains("water"));
    }
}
