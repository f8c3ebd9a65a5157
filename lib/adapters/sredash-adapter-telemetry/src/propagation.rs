use opentelemetry::propagation::Injector;
use reqwest::Url;

use sredash_ports::HttpRequest;

/// Hosts that may receive `traceparent` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationAllowList {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for PropagationAllowList {
    fn default() -> Self {
        Self::new(
            ["localhost"],
            [".local", ".svc.cluster.local", ".example.com"],
        )
    }
}

impl PropagationAllowList {
    /// `suffixes` start with a dot and match any subdomain.
    pub fn new<E, S>(exact: E, suffixes: S) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            exact: exact.into_iter().map(Into::into).collect(),
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.exact.iter().any(|exact| *exact == host)
            || self.suffixes.iter().any(|suffix| {
                host.ends_with(suffix.as_str()) || host == suffix.trim_start_matches('.')
            })
    }

    /// Unparseable URLs are never allowed.
    pub fn allows_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(|host| self.allows_host(host)))
            .unwrap_or(false)
    }
}

/// Writes propagation fields into an outgoing request's headers.
pub struct RequestInjector<'a>(pub &'a mut HttpRequest);

impl Injector for RequestInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.set_header(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hosts() {
        let allow = PropagationAllowList::default();
        assert!(allow.allows_url("http://localhost:8080/healthz"));
        assert!(allow.allows_url("http://backend.local/version"));
        assert!(allow.allows_url("http://backend.sre.svc.cluster.local:8080/readyz"));
        assert!(allow.allows_url("https://api.example.com/metrics"));
        assert!(allow.allows_url("https://example.com/metrics"));
    }

    #[test]
    fn test_rejected_hosts() {
        let allow = PropagationAllowList::default();
        assert!(!allow.allows_url("https://api.uptrace.dev/v1/traces"));
        assert!(!allow.allows_url("https://notexample.com/"));
        assert!(!allow.allows_url("http://10.0.0.5:8080/healthz"));
        assert!(!allow.allows_url("not a url"));
    }

    #[test]
    fn test_injector_sets_headers() {
        let mut request = HttpRequest::get("/healthz");
        RequestInjector(&mut request).set("traceparent", "00-abc-def-01".to_string());
        assert_eq!(request.header("traceparent"), Some("00-abc-def-01"));
    }
}
