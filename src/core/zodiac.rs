//! Zodiac sign tables

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Cardinal,
    Fixed,
    Mutable,
}

impl Element {
    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Earth => "earth",
            Element::Air => "air",
            Element::Water => "water",
        }
    }
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Cardinal => "cardinal",
            Modality::Fixed => "fixed",
            Modality::Mutable => "mutable",
        }
    }
}

/// (sign, first month, first day) in calendar order from Capricorn's January tail
const START_DATES: [(ZodiacSign, u32, u32); 12] = [
    (ZodiacSign::Aquarius, 1, 20),
    (ZodiacSign::Pisces, 2, 19),
    (ZodiacSign::Aries, 3, 21),
    (ZodiacSign::Taurus, 4, 20),
    (ZodiacSign::Gemini, 5, 21),
    (ZodiacSign::Cancer, 6, 21),
    (ZodiacSign::Leo, 7, 23),
    (ZodiacSign::Virgo, 8, 23),
    (ZodiacSign::Libra, 9, 23),
    (ZodiacSign::Scorpio, 10, 23),
    (ZodiacSign::Sagittarius, 11, 22),
    (ZodiacSign::Capricorn, 12, 22),
];

impl ZodiacSign {
    pub const ALL: [ZodiacSign; 12] = [
        ZodiacSign::Aries,
        ZodiacSign::Taurus,
        ZodiacSign::Gemini,
        ZodiacSign::Cancer,
        ZodiacSign::Leo,
        ZodiacSign::Virgo,
        ZodiacSign::Libra,
        ZodiacSign::Scorpio,
        ZodiacSign::Sagittarius,
        ZodiacSign::Capricorn,
        ZodiacSign::Aquarius,
        ZodiacSign::Pisces,
    ];

    /// Tropical sun sign for a birth month and day.
    pub fn from_date(month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }

        let mut sign = ZodiacSign::Capricorn;
        for (candidate, m, d) in START_DATES {
            if (month, day) >= (m, d) {
                sign = candidate;
            }
        }
        Some(sign)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "aries",
            ZodiacSign::Taurus => "taurus",
            ZodiacSign::Gemini => "gemini",
            ZodiacSign::Cancer => "cancer",
            ZodiacSign::Leo => "leo",
            ZodiacSign::Virgo => "virgo",
            ZodiacSign::Libra => "libra",
            ZodiacSign::Scorpio => "scorpio",
            ZodiacSign::Sagittarius => "sagittarius",
            ZodiacSign::Capricorn => "capricorn",
            ZodiacSign::Aquarius => "aquarius",
            ZodiacSign::Pisces => "pisces",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Aries",
            ZodiacSign::Taurus => "Taurus",
            ZodiacSign::Gemini => "Gemini",
            ZodiacSign::Cancer => "Cancer",
            ZodiacSign::Leo => "Leo",
            ZodiacSign::Virgo => "Virgo",
            ZodiacSign::Libra => "Libra",
            ZodiacSign::Scorpio => "Scorpio",
            ZodiacSign::Sagittarius => "Sagittarius",
            ZodiacSign::Capricorn => "Capricorn",
            ZodiacSign::Aquarius => "Aquarius",
            ZodiacSign::Pisces => "Pisces",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "♈",
            ZodiacSign::Taurus => "♉",
            ZodiacSign::Gemini => "♊",
            ZodiacSign::Cancer => "♋",
            ZodiacSign::Leo => "♌",
            ZodiacSign::Virgo => "♍",
            ZodiacSign::Libra => "♎",
            ZodiacSign::Scorpio => "♏",
            ZodiacSign::Sagittarius => "♐",
            ZodiacSign::Capricorn => "♑",
            ZodiacSign::Aquarius => "♒",
            ZodiacSign::Pisces => "♓",
        }
    }

    pub fn element(&self) -> Element {
        match self {
            ZodiacSign::Aries | ZodiacSign::Leo | ZodiacSign::Sagittarius => Element::Fire,
            ZodiacSign::Taurus | ZodiacSign::Virgo | ZodiacSign::Capricorn => Element::Earth,
            ZodiacSign::Gemini | ZodiacSign::Libra | ZodiacSign::Aquarius => Element::Air,
            ZodiacSign::Cancer | ZodiacSign::Scorpio | ZodiacSign::Pisces => Element::Water,
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            ZodiacSign::Aries | ZodiacSign::Cancer | ZodiacSign::Libra | ZodiacSign::Capricorn => {
                Modality::Cardinal
            }
            ZodiacSign::Taurus | ZodiacSign::Leo | ZodiacSign::Scorpio | ZodiacSign::Aquarius => {
                Modality::Fixed
            }
            _ => Modality::Mutable,
        }
    }

    pub fn ruling_planet(&self) -> &'static str {
        match self {
            ZodiacSign::Aries => "Mars",
            ZodiacSign::Taurus => "Venus",
            ZodiacSign::Gemini => "Mercury",
            ZodiacSign::Cancer => "Moon",
            ZodiacSign::Leo => "Sun",
            ZodiacSign::Virgo => "Mercury",
            ZodiacSign::Libra => "Venus",
            ZodiacSign::Scorpio => "Pluto",
            ZodiacSign::Sagittarius => "Jupiter",
            ZodiacSign::Capricorn => "Saturn",
            ZodiacSign::Aquarius => "Uranus",
            ZodiacSign::Pisces => "Neptune",
        }
    }

    /// Inclusive (month, day) bounds, e.g. `((3, 21), (4, 19))` for Aries
    pub fn date_range(&self) -> ((u32, u32), (u32, u32)) {
        let idx = START_DATES
            .iter()
            .position(|(s, _, _)| s == self)
            .unwrap_or(0);
        let (_, m, d) = START_DATES[idx];
        let (_, next_m, next_d) = START_DATES[(idx + 1) % START_DATES.len()];
        let end = if next_d == 1 {
            (next_m - 1, 31)
        } else {
            (next_m, next_d - 1)
        };
        ((m, d), end)
    }

    pub fn traits(&self) -> &'static [&'static str] {
        match self {
            ZodiacSign::Aries => &["bold", "energetic", "impulsive"],
            ZodiacSign::Taurus => &["patient", "reliable", "stubborn"],
            ZodiacSign::Gemini => &["curious", "adaptable", "restless"],
            ZodiacSign::Cancer => &["nurturing", "intuitive", "protective"],
            ZodiacSign::Leo => &["generous", "confident", "dramatic"],
            ZodiacSign::Virgo => &["analytical", "practical", "meticulous"],
            ZodiacSign::Libra => &["diplomatic", "fair-minded", "indecisive"],
            ZodiacSign::Scorpio => &["intense", "loyal", "secretive"],
            ZodiacSign::Sagittarius => &["adventurous", "optimistic", "blunt"],
            ZodiacSign::Capricorn => &["disciplined", "ambitious", "reserved"],
            ZodiacSign::Aquarius => &["inventive", "independent", "aloof"],
            ZodiacSign::Pisces => &["compassionate", "artistic", "dreamy"],
        }
    }
}

impl FromStr for ZodiacSign {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ZodiacSign::ALL
            .iter()
            .copied()
            .find(|sign| sign.as_str() == needle)
            .ok_or_else(|| format!("unknown zodiac sign: {}", s))
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn complementary(a: Element, b: Element) -> bool {
    matches!(
        (a, b),
        (Element::Fire, Element::Air)
            | (Element::Air, Element::Fire)
            | (Element::Earth, Element::Water)
            | (Element::Water, Element::Earth)
    )
}

/// Element-based baseline score, 0-100.
pub fn compatibility_score(a: ZodiacSign, b: ZodiacSign) -> u8 {
    let base = if a.element() == b.element() {
        85
    } else if complementary(a.element(), b.element()) {
        75
    } else {
        50
    };

    if a.modality() == b.modality() {
        (base + 5).min(100)
    } else {
        base
    }
}

/// Static facts served by the public sign endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SignFacts {
    pub sign: ZodiacSign,
    pub name: &'static str,
    pub symbol: &'static str,
    pub element: Element,
    pub modality: Modality,
    pub ruling_planet: &'static str,
    pub start: String,
    pub end: String,
    pub traits: &'static [&'static str],
}

impl From<ZodiacSign> for SignFacts {
    fn from(sign: ZodiacSign) -> Self {
        let ((sm, sd), (em, ed)) = sign.date_range();
        Self {
            sign,
            name: sign.display_name(),
            symbol: sign.symbol(),
            element: sign.element(),
            modality: sign.modality(),
            ruling_planet: sign.ruling_planet(),
            start: format!("{:02}-{:02}", sm, sd),
            end: format!("{:02}-{:02}", em, ed),
            traits: sign.traits(),
        }
    }
}
