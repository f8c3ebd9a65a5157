//! Exporter settings resolved from the layered configuration.

use std::collections::HashMap;
use std::time::Duration;

use opentelemetry::KeyValue;
use reqwest::Url;
use tracing::debug;

use sredash_domain::{ConfigKey, LayeredConfig};

pub const SERVICE_NAME: &str = "frontend";
pub const SERVICE_VERSION: &str = "1.0.0";
pub const DSN_HEADER: &str = "uptrace-dsn";
pub const DSN_FALLBACK_COLLECTOR: &str = "https://api.uptrace.dev/v1/traces";
pub const TRACES_PATH: &str = "/v1/traces";

/// Batch span processor limits. The queue drops spans once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    pub max_queue_size: usize,
    pub max_export_batch_size: usize,
    pub scheduled_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_queue_size: 100,
            max_export_batch_size: 10,
            scheduled_delay: Duration::from_millis(500),
        }
    }
}

impl BatchSettings {
    pub fn to_batch_config(self) -> opentelemetry_sdk::trace::BatchConfig {
        opentelemetry_sdk::trace::BatchConfigBuilder::default()
            .with_max_queue_size(self.max_queue_size)
            .with_max_export_batch_size(self.max_export_batch_size)
            .with_scheduled_delay(self.scheduled_delay)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    /// Full traces URL, `.../v1/traces` included.
    pub collector_url: String,
    pub headers: HashMap<String, String>,
    pub batch: BatchSettings,
    pub export_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            service_version: SERVICE_VERSION.to_string(),
            environment: default_of(ConfigKey::Environment),
            collector_url: default_of(ConfigKey::CollectorUrl),
            headers: HashMap::new(),
            batch: BatchSettings::default(),
            export_timeout: Duration::from_secs(10),
        }
    }
}

impl TelemetryConfig {
    /// A DSN, when present, replaces the collector URL and may add the
    /// credential header.
    pub fn resolve(config: &LayeredConfig) -> Self {
        let mut resolved = Self::default();
        if let Some(environment) = config.resolve(ConfigKey::Environment) {
            resolved.environment = environment;
        }
        if let Some(collector) = config.resolve(ConfigKey::CollectorUrl) {
            resolved.collector_url = collector;
        }
        if let Some(dsn) = config.lookup(ConfigKey::UptraceDsn) {
            resolved.apply_dsn(&dsn);
        }
        resolved
    }

    fn apply_dsn(&mut self, dsn: &str) {
        self.collector_url = dsn_collector_url(dsn);
        if dsn_has_credential(dsn) {
            self.headers.insert(DSN_HEADER.to_string(), dsn.to_string());
        } else {
            debug!("dsn carries no credential, header not set");
        }
    }

    pub fn resource_attributes(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new("service.name", self.service_name.clone()),
            KeyValue::new("service.version", self.service_version.clone()),
            KeyValue::new("deployment.environment", self.environment.clone()),
        ]
    }

    /// Collector base URL handed to the OTLP exporter, which appends the
    /// traces path itself.
    pub fn exporter_endpoint(&self) -> &str {
        let url = self.collector_url.trim_end_matches('/');
        url.strip_suffix(TRACES_PATH).unwrap_or(url)
    }
}

fn default_of(key: ConfigKey) -> String {
    key.default_value().unwrap_or_default().to_string()
}

/// The DSN's scheme, host and port with the traces path, or the hosted
/// default when the DSN has no usable host. Credentials and query are dropped.
pub fn dsn_collector_url(dsn: &str) -> String {
    let Some(mut url) = Url::parse(dsn).ok().filter(|url| url.host_str().is_some()) else {
        return DSN_FALLBACK_COLLECTOR.to_string();
    };
    // Both only fail for cannot-be-a-base URLs, which have no host.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(TRACES_PATH);
    url.to_string()
}

/// True for `https://TOKEN@host` shaped DSNs.
pub fn dsn_has_credential(dsn: &str) -> bool {
    Url::parse(dsn)
        .map(|url| url.scheme() == "https" && !url.username().is_empty())
        .unwrap_or(false)
}
