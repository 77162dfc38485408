//! HTTP client for the Bitrix24 REST API.
//!
//! Tool groups never talk to reqwest directly; they hold an `Arc<dyn Transport>`
//! so the remote API can be replaced by a recording stub in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::config::{Auth, BitrixConfig, ConfigError};

/// Parameters sent with a REST method call.
pub type Params = Map<String, Value>;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code}: {description}")]
    Api { code: String, description: String },

    #[error("Unauthorized: webhook URL or access token rejected")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The two primitives every tool group needs from the remote API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Call a method once. The returned list holds one item per response;
    /// the first item is the method's `result`.
    async fn call(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError>;

    /// Call a list method repeatedly until every page has been fetched.
    async fn get_all(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError>;
}

/// Spaces requests according to the portal's velocity policy and caps
/// the number in flight.
#[derive(Debug)]
struct Throttle {
    interval: Option<Duration>,
    next_slot: Mutex<Instant>,
    permits: Semaphore,
}

impl Throttle {
    fn new(config: &BitrixConfig) -> Self {
        let interval = (config.respect_velocity_policy
            && config.requests_per_second.is_finite()
            && config.requests_per_second > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / config.requests_per_second).ok())
            .flatten();

        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
            permits: Semaphore::new(config.request_pool_size.clamp(1, Semaphore::MAX_PERMITS)),
        }
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, ClientError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClientError::Server("request pool closed".to_string()))?;

        if let Some(interval) = self.interval {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            if *next > now {
                tokio::time::sleep_until(*next).await;
            }
            *next = (*next).max(now) + interval;
        }

        Ok(permit)
    }
}

/// HTTP client for a Bitrix24 portal.
#[derive(Debug)]
pub struct BitrixClient {
    auth: Auth,
    client: Client,
    throttle: Throttle,
}

impl BitrixClient {
    /// Validate the configuration and build the underlying HTTP client.
    pub fn connect(config: &BitrixConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let auth = config.auth()?;
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()?;

        tracing::info!("Connected to Bitrix24 at {}", redact(&auth));

        Ok(Self {
            auth,
            client,
            throttle: Throttle::new(config),
        })
    }

    /// POST a method call and return the decoded response body.
    async fn request(&self, method: &str, mut params: Params) -> Result<Value, ClientError> {
        let _permit = self.throttle.acquire().await?;

        if let Auth::Token { ref token, .. } = self.auth {
            params.insert("auth".to_string(), Value::String(token.clone()));
        }

        let url = format!("{}{}.json", self.auth.base_url(), method);
        tracing::debug!("Calling Bitrix24 method {}", method);

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(without_url)?;
        self.handle_response(response).await
    }

    /// Handle response, converting REST and HTTP errors to ClientError.
    async fn handle_response(&self, response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        let text = response.text().await.map_err(without_url)?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        // Bitrix24 reports method errors in the body, often with a 4xx status.
        if let Some(Value::Object(ref obj)) = body {
            if let Some(code) = obj.get("error") {
                let code = match code {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let description = obj
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Err(ClientError::Api { code, description });
            }
        }

        if !status.is_success() {
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::Server(format!("{}: {}", status, text))),
            };
        }

        body.ok_or_else(|| ClientError::InvalidResponse(format!("expected JSON, got: {}", text)))
    }
}

#[async_trait]
impl Transport for BitrixClient {
    async fn call(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError> {
        let body = self.request(method, params).await?;
        Ok(vec![body.get("result").cloned().unwrap_or(Value::Null)])
    }

    async fn get_all(&self, method: &str, params: Params) -> Result<Vec<Value>, ClientError> {
        let mut items = Vec::new();
        let mut start: u64 = 0;

        loop {
            let mut page_params = params.clone();
            page_params.insert("start".to_string(), Value::from(start));

            let body = self.request(method, page_params).await?;
            items.extend(page_items(body.get("result").cloned().unwrap_or(Value::Null)));

            match body.get("next").and_then(Value::as_u64) {
                Some(next) if next > start => start = next,
                _ => break,
            }
        }

        tracing::debug!("Fetched {} items from {}", items.len(), method);
        Ok(items)
    }
}

/// Extract the records from one page of a list method.
///
/// Most list methods return an array; some (e.g. `tasks.task.list`) wrap it
/// in an object with a single list-valued key.
fn page_items(result: Value) -> Vec<Value> {
    match result {
        Value::Array(items) => items,
        Value::Object(obj) => {
            if obj.len() == 1 && obj.values().all(Value::is_array) {
                match obj.into_iter().next() {
                    Some((_, Value::Array(items))) => items,
                    _ => Vec::new(),
                }
            } else {
                obj.into_iter().map(|(_, v)| v).collect()
            }
        }
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Strip the URL, which carries the webhook secret, from a request error.
fn without_url(err: reqwest::Error) -> ClientError {
    ClientError::Http(err.without_url())
}

fn redact(auth: &Auth) -> String {
    match auth {
        Auth::Webhook { base } => {
            // https://portal/rest/<user>/<secret>/ -> https://portal/rest/...
            match base.find("/rest/") {
                Some(idx) => format!("{}/rest/...", &base[..idx]),
                None => "<webhook>".to_string(),
            }
        }
        Auth::Token { base, .. } => base.clone(),
    }
}
