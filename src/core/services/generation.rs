//! AI content generation
//!
//! Credits are taken before the model is called. An unusable answer (or no
//! model configured) still delivers canned content and keeps the charge; a
//! failed upstream call refunds it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::credits::{CreditError, CreditLedger};
use crate::content::parse::{parse_content, ParseError};
use crate::content::{
    fallback, prompts, CompatibilityContent, HoroscopeContent, Period, TarotContent,
};
use crate::core::models::{
    clamp_paging, ContentEntry, ContentKind, GenerationOutcome, Page, TransactionKind,
    UsageSummary,
};
use crate::core::tarot::{self, DrawnCard, Spread};
use crate::core::traits::TextGenerator;
use crate::core::zodiac::{compatibility_score, ZodiacSign};
use crate::error::{AppError, FieldError};
use crate::upstream::UpstreamError;

pub const MAX_QUESTION_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Content service unavailable: {0}")]
    Upstream(String),

    #[error("Content not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not encode content: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(fields) => AppError::Validation(fields),
            GenerationError::Credit(e) => e.into(),
            GenerationError::Upstream(msg) => AppError::Upstream(msg),
            GenerationError::NotFound => AppError::NotFound("Content".to_string()),
            GenerationError::Database(e) => AppError::Database(e),
            GenerationError::Encode(e) => AppError::Internal(e.to_string()),
        }
    }
}

type GenerationResult<T> = Result<T, GenerationError>;

fn invalid(field: &str, message: impl Into<String>) -> GenerationError {
    GenerationError::Validation(vec![FieldError::new(field, message)])
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoroscopeRequest {
    /// Defaults to the sign stored on the profile
    pub sign: Option<String>,
    #[serde(default)]
    pub period: Period,
    /// `YYYY-MM-DD`, defaults to today (UTC)
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TarotRequest {
    #[serde(default = "default_spread")]
    pub spread: Spread,
    pub question: Option<String>,
}

fn default_spread() -> Spread {
    Spread::Single
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityRequest {
    pub sign_a: String,
    pub sign_b: String,
}

#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Horoscope(HoroscopeRequest),
    Tarot(TarotRequest),
    Compatibility(CompatibilityRequest),
}

/// Credit price of one request
pub fn cost_of(kind: ContentKind, spread: Option<Spread>) -> i64 {
    match kind {
        ContentKind::Horoscope => 1,
        ContentKind::Tarot => match spread.unwrap_or(Spread::Single) {
            Spread::Single => 1,
            Spread::ThreeCard => 2,
            Spread::CelticCross => 3,
        },
        ContentKind::Compatibility => 2,
    }
}

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub content: Value,
    pub outcome: GenerationOutcome,
    pub credits_spent: i64,
    pub balance: i64,
}

/// A validated request, ready to prompt
enum Job {
    Horoscope {
        sign: ZodiacSign,
        period: Period,
        date: String,
    },
    Tarot {
        spread: Spread,
        question: Option<String>,
        cards: Vec<DrawnCard>,
    },
    Compatibility {
        a: ZodiacSign,
        b: ZodiacSign,
    },
}

impl Job {
    fn kind(&self) -> ContentKind {
        match self {
            Job::Horoscope { .. } => ContentKind::Horoscope,
            Job::Tarot { .. } => ContentKind::Tarot,
            Job::Compatibility { .. } => ContentKind::Compatibility,
        }
    }

    fn cost(&self) -> i64 {
        match self {
            Job::Tarot { spread, .. } => cost_of(ContentKind::Tarot, Some(*spread)),
            other => cost_of(other.kind(), None),
        }
    }

    fn title(&self) -> String {
        match self {
            Job::Horoscope { sign, period, date } => {
                format!("{} {} horoscope, {}", sign.display_name(), period.as_str(), date)
            }
            Job::Tarot { spread, .. } => match spread {
                Spread::Single => "Single card tarot reading".to_string(),
                Spread::ThreeCard => "Three card tarot reading".to_string(),
                Spread::CelticCross => "Celtic cross tarot reading".to_string(),
            },
            Job::Compatibility { a, b } => {
                format!("{} & {} compatibility", a.display_name(), b.display_name())
            }
        }
    }

    fn prompt(&self) -> String {
        match self {
            Job::Horoscope { sign, period, date } => prompts::horoscope(*sign, *period, date),
            Job::Tarot {
                spread,
                question,
                cards,
            } => prompts::tarot(*spread, question.as_deref(), cards),
            Job::Compatibility { a, b } => prompts::compatibility(*a, *b),
        }
    }

    /// Typed content from the model's answer, with request fields filled in.
    fn parse(&self, raw: &str) -> Result<Value, ParseError> {
        let value = match self {
            Job::Horoscope { sign, period, date } => {
                let mut content: HoroscopeContent = parse_content(raw)?;
                content.sign = Some(*sign);
                content.period = *period;
                content.date = date.clone();
                serde_json::to_value(content)
            }
            Job::Tarot {
                spread,
                question,
                cards,
            } => {
                let mut content: TarotContent = parse_content(raw)?;
                if content.cards.len() != cards.len() {
                    return Err(ParseError::Incomplete);
                }
                // The deal is ours; only the interpretations come from the model
                for (reading, card) in content.cards.iter_mut().zip(cards) {
                    reading.position = card.position.clone();
                    reading.name = card.name.clone();
                    reading.reversed = card.reversed;
                }
                content.spread = *spread;
                content.question = question.clone();
                serde_json::to_value(content)
            }
            Job::Compatibility { a, b } => {
                let mut content: CompatibilityContent = parse_content(raw)?;
                content.sign_a = Some(*a);
                content.sign_b = Some(*b);
                content.score.get_or_insert_with(|| compatibility_score(*a, *b));
                serde_json::to_value(content)
            }
        };
        value.map_err(|e| ParseError::Shape(e.to_string()))
    }

    fn fallback(&self) -> Result<Value, serde_json::Error> {
        match self {
            Job::Horoscope { sign, period, date } => {
                serde_json::to_value(fallback::horoscope(*sign, *period, date))
            }
            Job::Tarot {
                spread,
                question,
                cards,
            } => serde_json::to_value(fallback::tarot(*spread, question.as_deref(), cards)),
            Job::Compatibility { a, b } => serde_json::to_value(fallback::compatibility(*a, *b)),
        }
    }
}

struct LogEntry<'a> {
    user_id: &'a str,
    kind: ContentKind,
    outcome: GenerationOutcome,
    credits_spent: i64,
    latency_ms: i64,
    error: Option<String>,
}

pub struct GenerationService {
    pool: SqlitePool,
    ledger: CreditLedger,
    generator: Arc<dyn TextGenerator>,
}

impl GenerationService {
    pub fn new(pool: SqlitePool, ledger: CreditLedger, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            pool,
            ledger,
            generator,
        }
    }

    pub async fn run(
        &self,
        user_id: &str,
        request: GenerationRequest,
    ) -> GenerationResult<GenerationResponse> {
        let job = self.prepare(user_id, request).await?;
        let kind = job.kind();
        let cost = job.cost();
        let title = job.title();

        let balance = self.ledger.deduct(user_id, cost, &title).await?;

        let started = Instant::now();
        let answer = self.generator.generate(&job.prompt()).await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let (content, outcome, error) = match answer {
            Ok(raw) => match job.parse(&raw) {
                Ok(content) => (Ok(content), GenerationOutcome::Generated, None),
                Err(e) => {
                    tracing::warn!("Unusable {} answer for {}: {}", kind, user_id, e);
                    (job.fallback(), GenerationOutcome::Fallback, Some(e.to_string()))
                }
            },
            Err(e @ (UpstreamError::NotConfigured(_) | UpstreamError::Decode(_))) => {
                tracing::info!("Serving fallback {} for {}: {}", kind, user_id, e);
                (job.fallback(), GenerationOutcome::Fallback, Some(e.to_string()))
            }
            Err(e) => {
                tracing::warn!("{} generation failed for {}: {}", kind, user_id, e);
                let cause = e.to_string();
                self.refund(user_id, kind, cost, latency_ms, &title, &cause)
                    .await;
                return Err(GenerationError::Upstream(cause));
            }
        };

        let entry = LogEntry {
            user_id,
            kind,
            outcome,
            credits_spent: cost,
            latency_ms,
            error,
        };
        let stored = match content {
            Ok(content) => self
                .store(&entry, &title, &content)
                .await
                .map(|id| (id, content)),
            Err(e) => Err(e.into()),
        };

        // Nothing was delivered, so the charge goes back
        let (id, content) = match stored {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Could not save {} for {}: {}", kind, user_id, e);
                self.refund(user_id, kind, cost, latency_ms, &title, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        tracing::info!(
            "Generated {} for {} ({}, {} credits, {}ms)",
            kind,
            user_id,
            outcome.as_str(),
            cost,
            latency_ms
        );

        Ok(GenerationResponse {
            id,
            kind,
            title,
            content,
            outcome,
            credits_spent: cost,
            balance,
        })
    }

    /// Library entry and its log row, in one transaction
    async fn store(
        &self,
        entry: &LogEntry<'_>,
        title: &str,
        content: &Value,
    ) -> GenerationResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO content_library (id, user_id, kind, title, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(entry.user_id)
        .bind(entry.kind.as_str())
        .bind(title)
        .bind(content.to_string())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        self.write_log(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Give the charge back and log the attempt as failed.
    async fn refund(
        &self,
        user_id: &str,
        kind: ContentKind,
        cost: i64,
        latency_ms: i64,
        title: &str,
        cause: &str,
    ) {
        let description = format!("Refund: {}", title);
        if let Err(e) = self
            .ledger
            .add(user_id, cost, TransactionKind::Refund, &description)
            .await
        {
            tracing::error!("Refund of {} credits to {} failed: {}", cost, user_id, e);
        }

        let logged = async {
            let mut conn = self.pool.acquire().await?;
            self.write_log(
                &mut conn,
                &LogEntry {
                    user_id,
                    kind,
                    outcome: GenerationOutcome::Failed,
                    credits_spent: 0,
                    latency_ms,
                    error: Some(cause.to_string()),
                },
            )
            .await
        };
        if let Err(e) = logged.await {
            tracing::error!("Failed to record generation failure: {}", e);
        }
    }

    async fn write_log(
        &self,
        conn: &mut sqlx::SqliteConnection,
        entry: &LogEntry<'_>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO generation_logs
                (id, user_id, kind, model, outcome, credits_spent, latency_ms, error, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(entry.user_id)
        .bind(entry.kind.as_str())
        .bind(self.generator.model())
        .bind(entry.outcome.as_str())
        .bind(entry.credits_spent)
        .bind(entry.latency_ms)
        .bind(entry.error.as_deref())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn prepare(&self, user_id: &str, request: GenerationRequest) -> GenerationResult<Job> {
        match request {
            GenerationRequest::Horoscope(req) => {
                let sign = match req.sign.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    Some(raw) => raw.parse::<ZodiacSign>().map_err(|e| invalid("sign", e))?,
                    None => self
                        .profile_sign(user_id)
                        .await?
                        .ok_or_else(|| {
                            invalid("sign", "No sign given and no birth date on the profile")
                        })?,
                };

                let date = match req.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    Some(raw) => chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|_| invalid("date", "Expected a YYYY-MM-DD date"))?
                        .to_string(),
                    None => chrono::Utc::now().date_naive().to_string(),
                };

                Ok(Job::Horoscope {
                    sign,
                    period: req.period,
                    date,
                })
            }
            GenerationRequest::Tarot(req) => {
                let question = req
                    .question
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty());
                if let Some(q) = &question {
                    if q.chars().count() > MAX_QUESTION_LENGTH {
                        return Err(invalid(
                            "question",
                            format!("Question must be at most {} characters", MAX_QUESTION_LENGTH),
                        ));
                    }
                }
                let cards = tarot::draw(req.spread, &mut rand::thread_rng());
                Ok(Job::Tarot {
                    spread: req.spread,
                    question,
                    cards,
                })
            }
            GenerationRequest::Compatibility(req) => {
                let mut errors = Vec::new();
                let a = req.sign_a.parse::<ZodiacSign>().map_err(|e| {
                    errors.push(FieldError::new("sign_a", e));
                });
                let b = req.sign_b.parse::<ZodiacSign>().map_err(|e| {
                    errors.push(FieldError::new("sign_b", e));
                });
                match (a, b) {
                    (Ok(a), Ok(b)) => Ok(Job::Compatibility { a, b }),
                    _ => Err(GenerationError::Validation(errors)),
                }
            }
        }
    }

    async fn profile_sign(&self, user_id: &str) -> Result<Option<ZodiacSign>, sqlx::Error> {
        let row = sqlx::query("SELECT zodiac_sign FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .and_then(|r| r.get::<Option<String>, _>("zodiac_sign"))
            .and_then(|s| s.parse().ok()))
    }

    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> GenerationResult<Page<ContentEntry>> {
        let (limit, offset) = clamp_paging(limit, offset);

        let rows = sqlx::query(
            "SELECT * FROM content_library WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(ContentEntry::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM content_library WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("n");

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    pub async fn get(&self, user_id: &str, id: &str) -> GenerationResult<ContentEntry> {
        let row = sqlx::query("SELECT * FROM content_library WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GenerationError::NotFound)?;
        Ok(ContentEntry::from_row(&row)?)
    }

    pub async fn usage(&self, user_id: &str) -> GenerationResult<Vec<UsageSummary>> {
        let rows = sqlx::query(
            "SELECT kind,
                    COUNT(*) AS requests,
                    SUM(CASE WHEN outcome = 'fallback' THEN 1 ELSE 0 END) AS fallbacks,
                    SUM(CASE WHEN outcome = 'failed' THEN 1 ELSE 0 END) AS failures,
                    SUM(credits_spent) AS credits_spent
             FROM generation_logs WHERE user_id = ?
             GROUP BY kind ORDER BY kind",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(UsageSummary {
                    kind: r.try_get("kind")?,
                    requests: r.try_get("requests")?,
                    fallbacks: r.try_get("fallbacks")?,
                    failures: r.try_get("failures")?,
                    credits_spent: r.try_get("credits_spent")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(GenerationError::from)
    }
}
