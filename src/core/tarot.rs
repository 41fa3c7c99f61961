//! Major Arcana deck

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct ArcanaCard {
    pub number: u8,
    pub name: &'static str,
    pub upright: &'static str,
    pub reversed: &'static str,
}

#[rustfmt::skip]
pub const MAJOR_ARCANA: [ArcanaCard; 22] = [
    ArcanaCard { number: 0, name: "The Fool", upright: "new beginnings, spontaneity, a leap of faith", reversed: "recklessness, hesitation, poor judgement" },
    ArcanaCard { number: 1, name: "The Magician", upright: "willpower, skill, manifestation", reversed: "manipulation, untapped talent, trickery" },
    ArcanaCard { number: 2, name: "The High Priestess", upright: "intuition, hidden knowledge, inner voice", reversed: "secrets, disconnection from intuition" },
    ArcanaCard { number: 3, name: "The Empress", upright: "abundance, nurturing, creativity", reversed: "dependence, creative block, smothering" },
    ArcanaCard { number: 4, name: "The Emperor", upright: "structure, authority, stability", reversed: "rigidity, domination, lack of discipline" },
    ArcanaCard { number: 5, name: "The Hierophant", upright: "tradition, guidance, shared values", reversed: "rebellion, unconventional paths" },
    ArcanaCard { number: 6, name: "The Lovers", upright: "union, harmony, meaningful choices", reversed: "imbalance, misalignment, indecision" },
    ArcanaCard { number: 7, name: "The Chariot", upright: "determination, control, victory", reversed: "scattered energy, loss of direction" },
    ArcanaCard { number: 8, name: "Strength", upright: "courage, patience, gentle power", reversed: "self-doubt, low energy, raw emotion" },
    ArcanaCard { number: 9, name: "The Hermit", upright: "introspection, solitude, inner guidance", reversed: "isolation, withdrawal, loneliness" },
    ArcanaCard { number: 10, name: "Wheel of Fortune", upright: "cycles, turning points, luck", reversed: "resistance to change, setbacks" },
    ArcanaCard { number: 11, name: "Justice", upright: "fairness, truth, accountability", reversed: "dishonesty, avoidance of consequences" },
    ArcanaCard { number: 12, name: "The Hanged Man", upright: "surrender, new perspective, pause", reversed: "stalling, needless sacrifice" },
    ArcanaCard { number: 13, name: "Death", upright: "endings, transformation, transition", reversed: "resisting change, stagnation" },
    ArcanaCard { number: 14, name: "Temperance", upright: "balance, moderation, patience", reversed: "excess, imbalance, haste" },
    ArcanaCard { number: 15, name: "The Devil", upright: "attachment, temptation, shadow self", reversed: "release, reclaiming power" },
    ArcanaCard { number: 16, name: "The Tower", upright: "sudden upheaval, revelation, breakthrough", reversed: "averted disaster, fear of change" },
    ArcanaCard { number: 17, name: "The Star", upright: "hope, renewal, serenity", reversed: "discouragement, lost faith" },
    ArcanaCard { number: 18, name: "The Moon", upright: "illusion, dreams, the subconscious", reversed: "clarity returning, released fear" },
    ArcanaCard { number: 19, name: "The Sun", upright: "joy, success, vitality", reversed: "temporary gloom, dimmed enthusiasm" },
    ArcanaCard { number: 20, name: "Judgement", upright: "awakening, reckoning, renewal", reversed: "self-criticism, ignoring the call" },
    ArcanaCard { number: 21, name: "The World", upright: "completion, fulfilment, wholeness", reversed: "unfinished business, shortcuts" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spread {
    Single,
    ThreeCard,
    CelticCross,
}

impl Spread {
    pub fn card_count(&self) -> usize {
        match self {
            Spread::Single => 1,
            Spread::ThreeCard => 3,
            Spread::CelticCross => 10,
        }
    }

    pub fn positions(&self) -> &'static [&'static str] {
        match self {
            Spread::Single => &["Guidance"],
            Spread::ThreeCard => &["Past", "Present", "Future"],
            Spread::CelticCross => &[
                "Present",
                "Challenge",
                "Foundation",
                "Recent past",
                "Potential",
                "Near future",
                "Self",
                "Environment",
                "Hopes and fears",
                "Outcome",
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Spread::Single => "single",
            Spread::ThreeCard => "three_card",
            Spread::CelticCross => "celtic_cross",
        }
    }
}

/// A card placed in a spread position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnCard {
    pub position: String,
    pub name: String,
    pub reversed: bool,
    pub keywords: String,
}

/// Deal distinct cards for each position of the spread.
pub fn draw<R: Rng>(spread: Spread, rng: &mut R) -> Vec<DrawnCard> {
    spread
        .positions()
        .iter()
        .zip(MAJOR_ARCANA.choose_multiple(rng, spread.card_count()))
        .map(|(position, card)| {
            let reversed = rng.gen_bool(0.3);
            DrawnCard {
                position: (*position).to_string(),
                name: card.name.to_string(),
                reversed,
                keywords: if reversed { card.reversed } else { card.upright }.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_draw_is_distinct_and_sized() {
        let mut rng = StdRng::seed_from_u64(7);
        for spread in [Spread::Single, Spread::ThreeCard, Spread::CelticCross] {
            let cards = draw(spread, &mut rng);
            assert_eq!(cards.len(), spread.card_count());
            let names: HashSet<_> = cards.iter().map(|c| c.name.clone()).collect();
            assert_eq!(names.len(), cards.len());
        }
    }

    #[test]
    fn test_positions_match_card_count() {
        for spread in [Spread::Single, Spread::ThreeCard, Spread::CelticCross] {
            assert_eq!(spread.positions().len(), spread.card_count());
        }
    }
}
