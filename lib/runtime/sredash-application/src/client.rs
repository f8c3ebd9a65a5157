//! Typed client for the backend's HTTP API.

use serde_json::Value;
use tracing::{error, info};

use sredash_domain::{EnvironmentInfo, ProbeEndpoint, VersionInfo};
use sredash_ports::{HttpRequest, HttpResponse, HttpTransport, ProbeError};

pub struct ProbeClient<T> {
    transport: T,
}

impl<T: HttpTransport> ProbeClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub async fn probe(&self, endpoint: ProbeEndpoint) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::get(endpoint.path())).await
    }

    pub async fn get_health(&self) -> Result<HttpResponse, ProbeError> {
        self.probe(ProbeEndpoint::Health).await
    }

    pub async fn get_ready(&self) -> Result<HttpResponse, ProbeError> {
        self.probe(ProbeEndpoint::Ready).await
    }

    pub async fn get_live(&self) -> Result<HttpResponse, ProbeError> {
        self.probe(ProbeEndpoint::Live).await
    }

    pub async fn enable_ready(&self) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::put("/readyz/enable")).await
    }

    pub async fn disable_ready(&self) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::put("/readyz/disable")).await
    }

    pub async fn enable_live(&self) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::put("/livez/enable")).await
    }

    pub async fn disable_live(&self) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::put("/livez/disable")).await
    }

    pub async fn get_version(&self) -> Result<VersionInfo, ProbeError> {
        self.get_json("/version").await
    }

    pub async fn get_env(&self) -> Result<EnvironmentInfo, ProbeError> {
        self.get_json("/env").await
    }

    /// Request headers as the backend received them.
    pub async fn get_headers(&self) -> Result<Value, ProbeError> {
        self.get_json("/headers").await
    }

    /// Raw exposition text; the body is never JSON-decoded.
    pub async fn get_metrics(&self) -> Result<String, ProbeError> {
        let request = HttpRequest::get("/metrics").with_header("Accept", "text/plain");
        self.execute(request).await.map(|response| response.body)
    }

    pub async fn get_openapi(&self) -> Result<Value, ProbeError> {
        self.get_json("/openapi").await
    }

    pub async fn trigger_panic(&self) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::get("/panic")).await
    }

    pub async fn delay(&self, seconds: f64) -> Result<HttpResponse, ProbeError> {
        self.execute(HttpRequest::get(format!("/delay/{seconds}"))).await
    }

    /// Ask the backend for an arbitrary status. Any status is accepted.
    pub async fn status(&self, code: u16) -> Result<HttpResponse, ProbeError> {
        self.dispatch(HttpRequest::get(format!("/status/{code}"))).await
    }

    pub async fn echo(
        &self,
        body: impl Into<String>,
        content_type: &str,
    ) -> Result<HttpResponse, ProbeError> {
        let request = HttpRequest::post("/echo", body).with_header("Content-Type", content_type);
        self.execute(request).await
    }

    async fn get_json<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R, ProbeError> {
        let response = self.execute(HttpRequest::get(path)).await?;
        serde_json::from_str(&response.body).map_err(|err| ProbeError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }

    /// Send and reject non-2xx responses.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ProbeError> {
        let method = request.method;
        let path = request.path.clone();
        let response = self.dispatch(request).await?;
        if response.is_success() {
            return Ok(response);
        }
        let err = ProbeError::Status {
            method,
            path,
            status: response.status,
            body: response.body,
        };
        error!(error = %err, "[API] Response error");
        Err(err)
    }

    /// Send and log at the boundary, whatever the outcome.
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ProbeError> {
        let method = request.method;
        let path = request.path.clone();
        info!(%method, %path, "[API] {method} {path}");
        match self.transport.send(request).await {
            Ok(response) => {
                info!(status = response.status, %path, "[API] {} {path}", response.status);
                Ok(response)
            }
            Err(err) => {
                error!(%method, %path, error = %err, "[API] Request error");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sredash_ports::HttpMethod;
    use sredash_ports::testing::ScriptedTransport;

    fn client() -> (ProbeClient<ScriptedTransport>, ScriptedTransport) {
        let transport = ScriptedTransport::new("http://localhost:8080");
        (ProbeClient::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_metrics_returned_as_raw_text() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Get, "/metrics", 200, "up 1\n");

        let body = client.get_metrics().await.unwrap();
        assert_eq!(body, "up 1\n");
        assert_eq!(transport.calls()[0].header("accept"), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_non_success_becomes_status_error() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Get, "/readyz", 503, "{\"status\":\"not ready\"}");

        let err = client.get_ready().await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
    }

    #[tokio::test]
    async fn test_transport_error_has_no_status() {
        let (client, transport) = client();
        transport.fail(HttpMethod::Get, "/livez", "connection refused");

        let err = client.get_live().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn test_version_decoding() {
        let (client, transport) = client();
        transport.respond(
            HttpMethod::Get,
            "/version",
            200,
            r#"{"version":"v1.2.3","commit":"deadbeef","commit_short":"dead","build_time":"2024-01-01T00:00:00Z"}"#,
        );

        let version = client.get_version().await.unwrap();
        assert_eq!(version.version, "v1.2.3");
        assert_eq!(version.commit_short, "dead");
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Get, "/env", 200, "<html>");

        let err = client.get_env().await.unwrap_err();
        assert!(matches!(err, ProbeError::Decode { ref path, .. } if path == "/env"));
    }

    #[tokio::test]
    async fn test_toggle_requests_use_put() {
        let (client, transport) = client();
        transport
            .respond(HttpMethod::Put, "/readyz/enable", 200, "{}")
            .respond(HttpMethod::Put, "/livez/disable", 200, "{}");

        client.enable_ready().await.unwrap();
        client.disable_live().await.unwrap();
        assert_eq!(transport.call_log(), vec!["PUT /readyz/enable", "PUT /livez/disable"]);
    }

    #[tokio::test]
    async fn test_status_accepts_any_code() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Get, "/status/418", 418, "status forced to 418\n");

        let response = client.status(418).await.unwrap();
        assert_eq!(response.status, 418);
    }

    #[tokio::test]
    async fn test_echo_sets_content_type() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Post, "/echo", 200, "hello");

        let response = client.echo("hello", "text/plain").await.unwrap();
        assert_eq!(response.body, "hello");
        let sent = &transport.calls()[0];
        assert_eq!(sent.header("content-type"), Some("text/plain"));
        assert_eq!(sent.body.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_delay_path_formatting() {
        let (client, transport) = client();
        transport.respond(HttpMethod::Get, "/delay/1.5", 200, "{\"delay\":\"1.5\"}");

        client.delay(1.5).await.unwrap();
        assert_eq!(transport.call_log(), vec!["GET /delay/1.5"]);
    }
}
