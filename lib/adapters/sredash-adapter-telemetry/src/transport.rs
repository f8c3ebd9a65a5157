//! Client spans around backend calls.

use async_trait::async_trait;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use sredash_ports::{HttpRequest, HttpResponse, HttpTransport, ProbeError};

use crate::config::{SERVICE_NAME, SERVICE_VERSION};
use crate::propagation::{PropagationAllowList, RequestInjector};

/// Wraps a transport so every call runs in a client span.
///
/// The span's parent is the current `tracing` span. W3C trace-context
/// headers are added only for hosts on the allow-list.
pub struct TracedTransport<T, R = BoxedTracer> {
    inner: T,
    tracer: R,
    propagator: TraceContextPropagator,
    allow_list: PropagationAllowList,
}

impl<T: HttpTransport> TracedTransport<T> {
    /// Uses the process-wide tracer provider.
    pub fn new(inner: T) -> Self {
        let tracer = global::tracer_provider().versioned_tracer(
            SERVICE_NAME,
            Some(SERVICE_VERSION),
            None::<&'static str>,
            None,
        );
        Self::with_tracer(inner, tracer)
    }
}

impl<T, R> TracedTransport<T, R>
where
    T: HttpTransport,
    R: Tracer + Send + Sync,
    R::Span: Send + Sync + 'static,
{
    pub fn with_tracer(inner: T, tracer: R) -> Self {
        Self {
            inner,
            tracer,
            propagator: TraceContextPropagator::new(),
            allow_list: PropagationAllowList::default(),
        }
    }

    pub fn with_allow_list(mut self, allow_list: PropagationAllowList) -> Self {
        self.allow_list = allow_list;
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn start_span(&self, request: &HttpRequest, url: &str) -> Context {
        let parent = tracing::Span::current().context();
        let span = self
            .tracer
            .span_builder(format!("HTTP {}", request.method))
            .with_kind(SpanKind::Client)
            .with_attributes(vec![KeyValue::new("url.full", url.to_string())])
            .start_with_context(&self.tracer, &parent);
        parent.with_span(span)
    }
}

#[async_trait]
impl<T, R> HttpTransport for TracedTransport<T, R>
where
    T: HttpTransport,
    R: Tracer + Send + Sync,
    R::Span: Send + Sync + 'static,
{
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, ProbeError> {
        let url = self.url_for(&request.path);
        let method = request.method;
        let cx = self.start_span(&request, &url);
        if self.allow_list.allows_url(&url) {
            self.propagator
                .inject_context(&cx, &mut RequestInjector(&mut request));
        }

        let outcome = self.inner.send(request).await;

        let span = cx.span();
        match &outcome {
            Ok(response) => {
                span.set_attribute(KeyValue::new(
                    "http.response.status_code",
                    i64::from(response.status),
                ));
                span.set_attribute(KeyValue::new(
                    "http.response.status_text",
                    response.status_text.clone(),
                ));
                if response.status >= 400 {
                    span.set_status(Status::error(format!("HTTP {}", response.status)));
                }
            }
            Err(err) => {
                span.record_error(err);
                span.set_status(Status::error(err.to_string()));
            }
        }
        span.set_attribute(KeyValue::new("http.request.method", method.as_str()));
        span.end();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_sdk::export::trace::SpanData;
    use opentelemetry_sdk::trace::TracerProvider;

    use super::*;
    use crate::test_support::InMemorySpanExporter;
    use sredash_ports::HttpMethod;
    use sredash_ports::testing::ScriptedTransport;

    fn traced(
        base_url: &str,
    ) -> (
        TracedTransport<ScriptedTransport, opentelemetry_sdk::trace::Tracer>,
        ScriptedTransport,
        InMemorySpanExporter,
        TracerProvider,
    ) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let scripted = ScriptedTransport::new(base_url);
        let transport = TracedTransport::with_tracer(scripted.clone(), provider.tracer("test"));
        (transport, scripted, exporter, provider)
    }

    /// The simple processor exports on its own thread; flushing waits for it.
    fn exported(provider: &TracerProvider, exporter: &InMemorySpanExporter) -> Vec<SpanData> {
        for result in provider.force_flush() {
            result.unwrap();
        }
        exporter.finished_spans()
    }

    fn attribute(span: &SpanData, key: &str) -> Option<String> {
        span.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| kv.value.to_string())
    }

    #[tokio::test]
    async fn test_span_enriched_with_response() {
        let (transport, scripted, exporter, provider) = traced("http://localhost:8080");
        scripted.respond(HttpMethod::Get, "/readyz", 503, "{}");

        let response = transport.send(HttpRequest::get("/readyz")).await.unwrap();
        assert_eq!(response.status, 503);

        let spans = exported(&provider, &exporter);
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "HTTP GET");
        assert_eq!(span.span_kind, SpanKind::Client);
        assert_eq!(attribute(span, "http.response.status_code").as_deref(), Some("503"));
        assert_eq!(
            attribute(span, "http.response.status_text").as_deref(),
            Some("Service Unavailable")
        );
        assert_eq!(attribute(span, "http.request.method").as_deref(), Some("GET"));
        assert_eq!(
            attribute(span, "url.full").as_deref(),
            Some("http://localhost:8080/readyz")
        );
    }

    #[tokio::test]
    async fn test_allowed_host_gets_traceparent() {
        let (transport, scripted, exporter, provider) = traced("http://localhost:8080");
        scripted.respond(HttpMethod::Get, "/healthz", 200, "{}");

        transport.send(HttpRequest::get("/healthz")).await.unwrap();

        let sent = scripted.calls();
        let traceparent = sent[0].header("traceparent").expect("traceparent header");
        let span = &exported(&provider, &exporter)[0];
        let trace_id = span.span_context.trace_id().to_string();
        assert!(traceparent.starts_with("00-"));
        assert!(traceparent.contains(&trace_id));
    }

    #[tokio::test]
    async fn test_foreign_host_gets_no_traceparent() {
        let (transport, scripted, exporter, provider) = traced("https://backend.internal.io");
        scripted.respond(HttpMethod::Get, "/healthz", 200, "{}");

        transport.send(HttpRequest::get("/healthz")).await.unwrap();

        assert_eq!(scripted.calls()[0].header("traceparent"), None);
        assert_eq!(exported(&provider, &exporter).len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_marks_span() {
        let (transport, scripted, exporter, provider) = traced("http://localhost:8080");
        scripted.fail(HttpMethod::Put, "/livez/enable", "connection refused");

        let err = transport.send(HttpRequest::put("/livez/enable")).await.unwrap_err();
        assert!(err.is_transport());

        let span = &exported(&provider, &exporter)[0];
        assert!(matches!(span.status, Status::Error { .. }));
        assert_eq!(attribute(span, "http.response.status_code"), None);
        assert_eq!(attribute(span, "http.request.method").as_deref(), Some("PUT"));
    }
}
