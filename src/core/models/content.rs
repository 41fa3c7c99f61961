use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Kind of generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Horoscope,
    Tarot,
    Compatibility,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Horoscope => "horoscope",
            ContentKind::Tarot => "tarot",
            ContentKind::Compatibility => "compatibility",
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horoscope" => Ok(ContentKind::Horoscope),
            "tarot" => Ok(ContentKind::Tarot),
            "compatibility" => Ok(ContentKind::Compatibility),
            other => Err(format!("unknown content kind: {}", other)),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a generation request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationOutcome {
    /// Parsed from the model's answer
    Generated,
    /// Canned content after an unusable answer or with no model configured
    Fallback,
    /// Upstream call failed, credits refunded
    Failed,
}

impl GenerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Generated => "generated",
            GenerationOutcome::Fallback => "fallback",
            GenerationOutcome::Failed => "failed",
        }
    }
}

/// Row from `content_library`
#[derive(Debug, Clone, Serialize)]
pub struct ContentEntry {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub content: serde_json::Value,
    pub created_at: i64,
}

impl ContentEntry {
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let payload: String = row.try_get("payload")?;
        Ok(Self {
            id: row.try_get("id")?,
            kind: kind.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            title: row.try_get("title")?,
            content: serde_json::from_str(&payload)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Per-kind aggregate from `generation_logs`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UsageSummary {
    pub kind: String,
    pub requests: i64,
    pub fallbacks: i64,
    pub failures: i64,
    pub credits_spent: i64,
}
