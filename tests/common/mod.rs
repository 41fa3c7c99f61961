#![allow(dead_code)]

use astrology_server::api::build_routes;
use astrology_server::config::Config;
use astrology_server::core::db::init_db;
use astrology_server::core::traits::{
    CheckoutSession, PaymentGateway, PaymentRequest, PublishedRate, RateSource, TextGenerator,
};
use astrology_server::state::{AppState, Limiters, Upstreams};
use astrology_server::upstream::UpstreamError;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use clap::Parser;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const PAYMENT_SECRET: &str = "test-webhook-secret";

/// Replays queued answers; an empty queue behaves like a missing API key
#[derive(Default)]
pub struct StubGenerator {
    answers: Mutex<Vec<Result<String, UpstreamError>>>,
}

impl StubGenerator {
    pub fn push(&self, answer: Result<String, UpstreamError>) {
        self.answers.lock().unwrap().push(answer);
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    fn model(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, UpstreamError> {
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            return Err(UpstreamError::NotConfigured("LLM API key"));
        }
        answers.remove(0)
    }
}

pub struct StubRates;

#[async_trait]
impl RateSource for StubRates {
    async fn fetch(&self) -> Result<Vec<PublishedRate>, UpstreamError> {
        Ok(vec![PublishedRate {
            code: "USD".to_string(),
            name: "US Dollar".to_string(),
            rate: 40.0,
            date: "19.10.2026".to_string(),
        }])
    }
}

#[derive(Default)]
pub struct StubGateway {
    pub requests: Mutex<Vec<PaymentRequest>>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_checkout(
        &self,
        request: &PaymentRequest,
    ) -> Result<CheckoutSession, UpstreamError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            payment_id: format!("pay-{}", request.order_id),
            checkout_url: format!("https://checkout.test/{}", request.order_id),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub generator: Arc<StubGenerator>,
    pub gateway: Arc<StubGateway>,
}

pub fn test_config() -> Config {
    Config::parse_from([
        "astrology-server",
        "--jwt-secret",
        "integration-secret",
        "--database-url",
        "sqlite::memory:",
        "--bcrypt-cost",
        "4",
        "--signup-bonus-credits",
        "3",
        "--payment-merchant-id",
        "merchant-test",
        "--payment-secret",
        PAYMENT_SECRET,
        "--public-base-url",
        "https://astro.test",
    ])
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Limiters::default()).await
}

pub async fn spawn_app_with(limiters: Limiters) -> TestApp {
    let config = test_config();
    let pool = init_db(&config.database_url).await.unwrap();

    let generator = Arc::new(StubGenerator::default());
    let gateway = Arc::new(StubGateway::default());
    let upstreams = Upstreams {
        generator: generator.clone(),
        rates: Arc::new(StubRates),
        gateway: gateway.clone(),
    };

    let state = Arc::new(AppState::with_upstreams(config, pool, upstreams, limiters));
    TestApp {
        router: build_routes(state.clone()),
        state,
        generator,
        gateway,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    /// Register a fresh account and return its bearer token
    pub async fn register(&self, email: &str) -> String {
        let res = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "correct-horse-42",
                    "name": "Test User",
                    "birth_date": "1990-08-01"
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn balance(&self, token: &str) -> i64 {
        let res = self.get("/api/credits", Some(token)).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["data"]["balance"].as_i64().unwrap()
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
