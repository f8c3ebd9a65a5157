//! In-memory transport with scripted replies, for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ProbeError};

#[derive(Debug, Clone)]
enum Reply {
    Respond(HttpResponse),
    Fail(ProbeError),
}

#[derive(Debug, Clone)]
struct Route {
    reply: Reply,
    delay: Option<Duration>,
}

/// Replies to `(method, path)` pairs from a script and records every request.
///
/// Unscripted routes answer `404 Not Found`. Clones share the same script and
/// call log.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    base_url: String,
    routes: Arc<Mutex<HashMap<(HttpMethod, String), Route>>>,
    calls: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            routes: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.script(method, path, Reply::Respond(response(status, body)), None)
    }

    pub fn respond_after(
        &self,
        method: HttpMethod,
        path: &str,
        delay: Duration,
        status: u16,
        body: &str,
    ) -> &Self {
        self.script(method, path, Reply::Respond(response(status, body)), Some(delay))
    }

    /// Fail the route as if the request never completed.
    pub fn fail(&self, method: HttpMethod, path: &str, message: &str) -> &Self {
        let error = ProbeError::transport(method, path, message);
        self.script(method, path, Reply::Fail(error), None)
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().expect("call log lock poisoned").clone()
    }

    /// Requests as `METHOD path`, in the order they were issued.
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().expect("call log lock poisoned").clear();
    }

    fn script(&self, method: HttpMethod, path: &str, reply: Reply, delay: Option<Duration>) -> &Self {
        self.routes
            .lock()
            .expect("route table lock poisoned")
            .insert((method, path.to_string()), Route { reply, delay });
        self
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ProbeError> {
        let route = {
            let key = (request.method, request.path.clone());
            self.calls
                .lock()
                .expect("call log lock poisoned")
                .push(request);
            self.routes
                .lock()
                .expect("route table lock poisoned")
                .get(&key)
                .cloned()
        };

        let Some(route) = route else {
            return Ok(response(404, "404 page not found"));
        };
        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }
        match route.reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}

fn response(status: u16, body: &str) -> HttpResponse {
    let status_text = match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    };
    HttpResponse::new(status, body).with_status_text(status_text)
}
