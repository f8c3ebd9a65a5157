//! `HttpTransport` over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Url};
use tracing::debug;

use sredash_ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ProbeError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProbeError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Every request carries `Content-Type: application/json` unless it sets
    /// its own.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|err| ProbeError::InvalidRequest(format!("base url {base_url:?}: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| ProbeError::InvalidRequest(err.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn failure(&self, method: HttpMethod, path: &str, err: reqwest::Error) -> ProbeError {
        let message = if err.is_timeout() {
            timeout_message(self.timeout)
        } else {
            err.to_string()
        };
        ProbeError::transport(method, path, message)
    }
}

fn timeout_message(timeout: Duration) -> String {
    format!("timeout of {}ms exceeded", timeout.as_millis())
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Post => Method::POST,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProbeError> {
        let HttpRequest {
            method,
            path,
            headers,
            body,
        } = request;
        let url = self.url_for(&path);

        let mut builder = self.client.request(to_reqwest(method), &url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.failure(method, &path, err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.failure(method, &path, err))?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "response received");

        Ok(HttpResponse::new(status.as_u16(), body)
            .with_status_text(status.canonical_reason().unwrap_or_default()))
    }
}
