//! Prompt Finder endpoint client.
//!
//! This crate provides a lightweight client for the two server round trips the workflow page
//! performs:
//!
//! - submitting a star rating for a workflow
//! - toggling a workflow in the viewer's favorites
//!
//! The primary entry point is [`PromptFinderClient`]. Create an instance via
//! [`PromptFinderClient::new_from_env`] and call [`PromptFinderClient::submit_rating`] or
//! [`PromptFinderClient::toggle_favorite`].
//!
//! # Example
//!
//! ```ignore
//! use pf_api::PromptFinderClient;
//! use pf_types::RatingRequest;
//!
//! async fn rate() -> anyhow::Result<()> {
//!     let client = PromptFinderClient::new_from_env()?;
//!     let summary = client.submit_rating(&RatingRequest { workflow_id: 42, rating: 5 }).await?;
//!     println!("avg {} over {}", summary.avg, summary.count);
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pf_types::{FavoriteDenial, FavoriteRequest, FavoriteToggle, RatingRequest, RatingSummary};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Environment variable holding the endpoint base URL.
pub const API_BASE_ENV: &str = "PF_API_BASE";
/// Environment variable holding the anti-forgery token sent with every request.
pub const API_NONCE_ENV: &str = "PF_API_NONCE";
/// Environment variable holding a session cookie for logged-in requests.
pub const API_SESSION_ENV: &str = "PF_SESSION_COOKIE";

const DEFAULT_API_BASE: &str = "http://localhost:8080/wp-json/prompt-finder/v1";
const RATE_PATH: &str = "/rate";
const FAVORITE_PATH: &str = "/favorite";
const NONCE_HEADER: &str = "x-pf-nonce";
const ALREADY_RATED: &str = "already_rated";

/// Hostnames allowed over plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Failure modes of an endpoint call, distinguished so the page can react differently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The viewer already rated this workflow; carries the current aggregate.
    #[error("already rated")]
    AlreadyRated(RatingSummary),
    /// The favorite toggle was refused.
    #[error("favorite denied: {0:?}")]
    Denied(FavoriteDenial),
    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for the Prompt Finder endpoints.
pub struct PromptFinderClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
    nonce: Option<String>,
}

impl PromptFinderClient {
    /// Construct a client from `PF_API_BASE`, `PF_API_NONCE`, and `PF_SESSION_COOKIE`.
    ///
    /// Non-localhost base URLs must use HTTPS.
    pub fn new_from_env() -> Result<Self> {
        let base_url = env::var(API_BASE_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let nonce = env::var(API_NONCE_ENV).ok().filter(|value| !value.trim().is_empty());
        let session = env::var(API_SESSION_ENV).ok().filter(|value| !value.trim().is_empty());
        Self::new(&base_url, nonce, session)
    }

    pub fn new(base_url: &str, nonce: Option<String>, session_cookie: Option<String>) -> Result<Self> {
        validate_base_url(base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(cookie) = session_cookie {
            default_headers.insert(
                header::COOKIE,
                header::HeaderValue::from_str(&cookie).context("session cookie is not a valid header value")?,
            );
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("prompt-finder/0.1; {}", env::consts::OS),
            nonce,
        })
    }

    /// Build a POST request for an endpoint-relative path.
    pub fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");

        let builder = self.http.post(url).header(header::USER_AGENT, &self.user_agent);
        match &self.nonce {
            Some(nonce) => builder.header(NONCE_HEADER, nonce),
            None => builder,
        }
    }

    /// Submit a 1–5 star rating.
    pub async fn submit_rating(&self, request: &RatingRequest) -> Result<RatingSummary, ApiError> {
        let (status, body) = self.send_json(RATE_PATH, request).await?;
        parse_rating_response(status, &body)
    }

    /// Toggle a workflow in the viewer's favorites.
    pub async fn toggle_favorite(&self, request: &FavoriteRequest) -> Result<FavoriteToggle, ApiError> {
        let (status, body) = self.send_json(FAVORITE_PATH, request).await?;
        parse_favorite_response(status, &body)
    }

    async fn send_json<T: serde::Serialize>(&self, path: &str, payload: &T) -> Result<(StatusCode, String), ApiError> {
        let response = self
            .post(path)
            .json(payload)
            .send()
            .await
            .map_err(|error| ApiError::Network(error.to_string()))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), path, "endpoint responded");
        Ok((status, body))
    }
}

/// Interprets a rating endpoint response.
///
/// Accepts both `{ "success": true, "data": { "avg", "count" } }` and a flat
/// `{ "avg", "count" }` body. A 409 (or an `already_rated` message) maps to
/// [`ApiError::AlreadyRated`] with the aggregate the server reported.
pub fn parse_rating_response(status: StatusCode, body: &str) -> Result<RatingSummary, ApiError> {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let data = payload_data(&json);

    let already_rated = status == StatusCode::CONFLICT || message_of(&json).as_deref() == Some(ALREADY_RATED);
    if already_rated {
        return Err(ApiError::AlreadyRated(summary_from(data)));
    }

    if !status.is_success() || json.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(rejection(status, &json));
    }

    if data.get("avg").is_none() && data.get("count").is_none() {
        return Err(ApiError::InvalidResponse("missing avg/count".to_string()));
    }
    Ok(summary_from(data))
}

/// Interprets a favorite endpoint response.
///
/// 401 means the viewer is not logged in; 403 means the viewer is not entitled.
pub fn parse_favorite_response(status: StatusCode, body: &str) -> Result<FavoriteToggle, ApiError> {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    match status {
        StatusCode::UNAUTHORIZED => return Err(ApiError::Denied(FavoriteDenial::NotLoggedIn)),
        StatusCode::FORBIDDEN => return Err(ApiError::Denied(FavoriteDenial::NotEntitled)),
        _ => {}
    }
    if !status.is_success() || json.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(rejection(status, &json));
    }

    let data = payload_data(&json);
    let added = data
        .get("added")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::InvalidResponse("missing added flag".to_string()))?;
    let count = data.get("count").and_then(Value::as_u64).unwrap_or(0);
    Ok(FavoriteToggle { added, count })
}

fn payload_data(json: &Value) -> &Value {
    match json.get("data") {
        Some(data) if data.is_object() => data,
        _ => json,
    }
}

fn message_of(json: &Value) -> Option<String> {
    json.get("message")
        .or_else(|| payload_data(json).get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn summary_from(data: &Value) -> RatingSummary {
    RatingSummary {
        avg: data.get("avg").and_then(Value::as_f64).unwrap_or(0.0),
        count: data.get("count").and_then(Value::as_u64).unwrap_or(0),
    }
}

fn rejection(status: StatusCode, json: &Value) -> ApiError {
    ApiError::Rejected {
        status: status.as_u16(),
        message: message_of(json).unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(base: &str) -> Result<()> {
    let parsed_base_url = Url::parse(base).map_err(|e| anyhow!("Invalid {} URL '{}': {}", API_BASE_ENV, base, e))?;

    let host_name = parsed_base_url
        .host_str()
        .ok_or_else(|| anyhow!("{} must include a host", API_BASE_ENV))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(anyhow!(
            "{} must use https for non-localhost hosts; got '{}://'",
            API_BASE_ENV,
            parsed_base_url.scheme()
        ));
    }
    Ok(())
}
