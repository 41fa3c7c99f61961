//! Generated content: prompt templates, answer parsing and canned fallbacks

pub mod fallback;
pub mod parse;
pub mod prompts;

use serde::{Deserialize, Serialize};

use crate::core::tarot::Spread;
use crate::core::zodiac::ZodiacSign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        }
    }
}

/// Content that can be rejected as incomplete after parsing
pub trait Complete {
    fn is_complete(&self) -> bool;
}

fn filled(s: &str) -> bool {
    !s.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoroscopeContent {
    #[serde(default)]
    pub sign: Option<ZodiacSign>,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub date: String,
    pub summary: String,
    pub love: String,
    pub career: String,
    pub health: String,
    #[serde(default)]
    pub lucky_numbers: Vec<u8>,
    #[serde(default)]
    pub lucky_color: String,
}

impl Complete for HoroscopeContent {
    fn is_complete(&self) -> bool {
        filled(&self.summary) && filled(&self.love) && filled(&self.career) && filled(&self.health)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardReading {
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reversed: bool,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TarotContent {
    #[serde(default = "default_spread")]
    pub spread: Spread,
    #[serde(default)]
    pub question: Option<String>,
    pub cards: Vec<CardReading>,
    pub summary: String,
    pub advice: String,
}

fn default_spread() -> Spread {
    Spread::Single
}

impl Complete for TarotContent {
    fn is_complete(&self) -> bool {
        !self.cards.is_empty()
            && self.cards.iter().all(|c| filled(&c.interpretation))
            && filled(&self.summary)
            && filled(&self.advice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityContent {
    #[serde(default)]
    pub sign_a: Option<ZodiacSign>,
    #[serde(default)]
    pub sign_b: Option<ZodiacSign>,
    /// Absent when the model left it out
    #[serde(default)]
    pub score: Option<u8>,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    pub advice: String,
}

impl Complete for CompatibilityContent {
    fn is_complete(&self) -> bool {
        filled(&self.summary) && filled(&self.advice) && self.score.map_or(true, |s| s <= 100)
    }
}
