//! HTTP transport for gateway calls.

use crate::policy::{GatewayPolicy, TimeoutConfig};
use crate::PaymentError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An outbound gateway request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A gateway response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PaymentError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends gateway requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PaymentError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: TimeoutConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.connect)
            .timeout(timeout.total)
            .build()
            .map_err(|e| PaymentError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, PaymentError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(&request.url, e))?;
        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(url: &str, e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout(format!("{}: {}", url, e))
    } else if e.is_connect() {
        PaymentError::Connection(format!("{}: {}", url, e))
    } else {
        PaymentError::Request(format!("{}: {}", url, e))
    }
}

/// Send a request under a gateway policy.
///
/// Every attempt is bounded by `policy.timeout.total`. Timeouts, connection
/// errors and 5xx answers are retried per `policy.retry`; a final 4xx or
/// 5xx answer is returned as [`PaymentError::Http`].
pub async fn send_with_policy(
    transport: &dyn HttpTransport,
    request: HttpRequest,
    policy: &GatewayPolicy,
) -> Result<HttpResponse, PaymentError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout.total, transport.send(request.clone())).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Timeout(format!(
                "{} after {:?}",
                request.url, policy.timeout.total
            ))),
        };

        let retry = match &result {
            Ok(response) => policy.retry.should_retry_status(response.status, attempt),
            Err(PaymentError::Timeout(_)) | Err(PaymentError::Connection(_)) => {
                policy.retry.should_retry_transport(attempt)
            }
            Err(_) => false,
        };

        if !retry {
            let response = result?;
            if !response.is_success() {
                debug!(url = %request.url, status = response.status, body = %response.body, "Gateway error response");
                return Err(PaymentError::Http {
                    status: response.status,
                    url: request.url,
                });
            }
            return Ok(response);
        }

        let delay = policy.retry.backoff.delay_for_attempt(attempt);
        warn!(url = %request.url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Retrying gateway call");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
