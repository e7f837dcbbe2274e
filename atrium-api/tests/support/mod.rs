#![allow(dead_code)]

use atrium_api::{app, AppState};
use atrium_store::app_config::{
    AuthConfig, BookingRules, Config, ProcessorConfig, ServerConfig,
};
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> Config {
    let mut rates = HashMap::new();
    rates.insert("EUR".to_string(), 0.92);
    rates.insert("GBP".to_string(), 0.79);

    Config {
        server: ServerConfig { port: 0 },
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            jwt_expiration_seconds: 3600,
        },
        booking_rules: BookingRules {
            // Short card timeout so slow-provider tests finish quickly.
            card_timeout_ms: 200,
            ..BookingRules::default()
        },
        pricing: Default::default(),
        rates: atrium_shared::money::RateTable {
            base_currency: "USD".to_string(),
            rates,
        },
        processor: ProcessorConfig::default(),
    }
}

pub async fn test_app() -> (Router, AppState) {
    let state = AppState::from_config(&test_config()).await;
    (app(state.clone()), state)
}

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    role: String,
    exp: usize,
}

fn mint_token(sub: &str, role: &str) -> String {
    let claims = TestClaims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn customer_token(sub: &str) -> String {
    mint_token(sub, "CUSTOMER")
}

pub fn admin_token(sub: &str) -> String {
    mint_token(sub, "ADMIN")
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(value) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
