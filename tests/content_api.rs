mod common;

use astrology_server::ratelimit::{
    FixedWindowLimiter, SlidingWindowLimiter, TokenBucketLimiter,
};
use astrology_server::state::Limiters;
use astrology_server::upstream::UpstreamError;
use axum::http::{header, StatusCode};
use common::{spawn_app, spawn_app_with};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn horoscope_uses_profile_sign_and_model_answer() {
    let app = spawn_app().await;
    let token = app.register("leo@example.com").await;

    app.generator.push(Ok(r#"Here you go:
```json
{"summary": "A bright week.", "love": "Warm.", "career": "Bold moves pay.", "health": "Rest.",
 "lucky_numbers": [5, 19], "lucky_color": "gold"}
```"#
        .to_string()));

    let res = app
        .post(
            "/api/ai/horoscope",
            Some(&token),
            json!({"period": "weekly", "date": "2026-10-19"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    let data = &res.body["data"];
    assert_eq!(data["outcome"], "generated");
    assert_eq!(data["credits_spent"], 1);
    assert_eq!(data["balance"], 2);
    assert_eq!(data["content"]["sign"], "leo");
    assert_eq!(data["content"]["period"], "weekly");
    assert_eq!(data["content"]["lucky_color"], "gold");
    assert!(res.headers.contains_key("x-ratelimit-remaining"));

    // Stored in the library
    let id = data["id"].as_str().unwrap();
    let entry = app
        .get(&format!("/api/ai/history/{}", id), Some(&token))
        .await;
    assert_eq!(entry.status, StatusCode::OK);
    assert_eq!(entry.body["data"]["content"]["summary"], "A bright week.");
}

#[tokio::test]
async fn fallback_content_is_charged() {
    let app = spawn_app().await;
    let token = app.register("fallback@example.com").await;

    // No queued answer behaves like a missing API key
    let res = app
        .post("/api/ai/horoscope", Some(&token), json!({"sign": "Pisces"}))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["outcome"], "fallback");
    assert_eq!(res.body["data"]["content"]["sign"], "pisces");
    assert_eq!(app.balance(&token).await, 2);

    // So is an answer that cannot be parsed
    app.generator.push(Ok("The stars are silent today.".to_string()));
    let res = app
        .post("/api/ai/tarot", Some(&token), json!({"question": "Should I move?"}))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["outcome"], "fallback");
    assert_eq!(res.body["data"]["content"]["cards"].as_array().unwrap().len(), 1);
    assert_eq!(app.balance(&token).await, 1);
}

#[tokio::test]
async fn insufficient_credits_leave_balance_untouched() {
    let app = spawn_app().await;
    let token = app.register("broke@example.com").await;
    let body = json!({"sign_a": "aries", "sign_b": "libra"});

    let first = app
        .post("/api/ai/compatibility", Some(&token), body.clone())
        .await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["data"]["credits_spent"], 2);

    let second = app.post("/api/ai/compatibility", Some(&token), body).await;
    assert_eq!(second.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(app.balance(&token).await, 1);

    let history = app.get("/api/ai/history", Some(&token)).await;
    assert_eq!(history.body["data"]["total"], 1);
}

#[tokio::test]
async fn upstream_failure_refunds_credits() {
    let app = spawn_app().await;
    let token = app.register("refund@example.com").await;

    app.generator.push(Err(UpstreamError::Status {
        status: 503,
        body: "overloaded".to_string(),
    }));
    let res = app
        .post("/api/ai/tarot", Some(&token), json!({"spread": "three_card"}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_GATEWAY);
    assert_eq!(app.balance(&token).await, 3);

    let ledger = app
        .get("/api/credits/transactions", Some(&token))
        .await;
    let kinds: Vec<&str> = ledger.body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"refund"), "{:?}", kinds);
    assert!(kinds.contains(&"spend"), "{:?}", kinds);

    let usage = app.get("/api/ai/usage", Some(&token)).await;
    let tarot = &usage.body["data"][0];
    assert_eq!(tarot["kind"], "tarot");
    assert_eq!(tarot["failures"], 1);
    assert_eq!(tarot["credits_spent"], 0);

    // Nothing was stored
    let history = app.get("/api/ai/history", Some(&token)).await;
    assert_eq!(history.body["data"]["total"], 0);
}

#[tokio::test]
async fn generation_validates_before_charging() {
    let app = spawn_app().await;
    let token = app.register("strict@example.com").await;

    let res = app
        .post(
            "/api/ai/compatibility",
            Some(&token),
            json!({"sign_a": "dragon", "sign_b": "leo"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"][0]["field"], "sign_a");

    let res = app
        .post(
            "/api/ai/tarot",
            Some(&token),
            json!({"question": "?".repeat(600)}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.balance(&token).await, 3);

    let res = app.post("/api/ai/horoscope", None, json!({})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn library_entries_are_private() {
    let app = spawn_app().await;
    let owner = app.register("owner@example.com").await;
    let other = app.register("other@example.com").await;

    let res = app
        .post("/api/ai/horoscope", Some(&owner), json!({}))
        .await;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    let peek = app
        .get(&format!("/api/ai/history/{}", id), Some(&other))
        .await;
    assert_eq!(peek.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn currency_endpoints() {
    let app = spawn_app().await;

    let rates = app.get("/api/currency/rates", None).await;
    assert_eq!(rates.status, StatusCode::OK);
    assert_eq!(rates.body["data"]["base"], "UAH");
    assert_eq!(rates.body["data"]["source"], "live");

    let converted = app
        .get("/api/currency/convert?amount=2.5&from=usd&to=UAH", None)
        .await;
    assert_eq!(converted.status, StatusCode::OK, "{}", converted.body);
    let result: f64 = converted.body["data"]["result"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((result - 100.0).abs() < 1e-9);
    assert_eq!(converted.body["data"]["rate_source"], "cached");

    let bad = app
        .get("/api/currency/convert?amount=lots&from=USD&to=UAH", None)
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    // The feed only publishes USD; the other supported codes still convert
    let gbp = app
        .get("/api/currency/convert?amount=100&from=UAH&to=GBP", None)
        .await;
    assert_eq!(gbp.status, StatusCode::OK, "{}", gbp.body);
}

#[tokio::test]
async fn oversized_conversion_is_rejected() {
    let app = spawn_app().await;
    let res = app
        .get(
            "/api/currency/convert?amount=79228162514264337593543950335&from=USD&to=UAH",
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["details"][0]["field"], "amount");
}

#[tokio::test]
async fn generation_is_rate_limited_per_user() {
    let app = spawn_app_with(Limiters {
        auth: FixedWindowLimiter::new(10, Duration::from_secs(900)),
        ai: SlidingWindowLimiter::new(1, Duration::from_secs(60)),
        api: TokenBucketLimiter::new(60, 1.0),
    })
    .await;
    let first = app.register("eager@example.com").await;
    let second = app.register("calm@example.com").await;

    let ok = app.post("/api/ai/horoscope", Some(&first), json!({})).await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);

    let limited = app
        .post("/api/ai/tarot", Some(&first), json!({}))
        .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    let retry: u64 = limited.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry > 0 && retry <= 60);
    assert_eq!(app.balance(&first).await, 2);

    // Keyed by user, not by address
    let other = app.post("/api/ai/horoscope", Some(&second), json!({})).await;
    assert_eq!(other.status, StatusCode::OK);
}
