use std::fmt::Display;

use tracing::{error, info, instrument};

use sredash_domain::{
    ApplicationSnapshot, DerivedStatus, EnvironmentInfo, HealthState, MetricsSnapshot,
    VersionInfo, parse_metrics,
};
use sredash_ports::HttpTransport;

use crate::client::ProbeClient;
use crate::health::{self, ToggleTarget};

/// Dashboard state store.
///
/// Refresh methods never fail: a failed call leaves the previous value in
/// place and records the error message in `last_error`. The message sticks
/// until the next failure or an explicit [`Dashboard::clear_error`].
pub struct Dashboard<T> {
    client: ProbeClient<T>,
    snapshot: ApplicationSnapshot,
    loading: bool,
}

impl<T: HttpTransport> Dashboard<T> {
    pub fn new(transport: T) -> Self {
        Self::with_client(ProbeClient::new(transport))
    }

    pub fn with_client(client: ProbeClient<T>) -> Self {
        Self {
            client,
            snapshot: ApplicationSnapshot::default(),
            loading: false,
        }
    }

    pub fn client(&self) -> &ProbeClient<T> {
        &self.client
    }

    #[instrument(skip(self))]
    pub async fn fetch_version(&mut self) {
        match self.client.get_version().await {
            Ok(version) => {
                self.snapshot.version = Some(version);
                self.snapshot.touch();
            }
            Err(err) => self.record_error("fetch version", err),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_health(&mut self) {
        self.snapshot.health = health::fetch_health(&self.client).await;
        self.snapshot.touch();
    }

    #[instrument(skip(self))]
    pub async fn fetch_metrics(&mut self) {
        match self.client.get_metrics().await {
            Ok(text) => {
                self.snapshot.metrics = Some(parse_metrics(&text));
                self.snapshot.touch();
            }
            Err(err) => self.record_error("fetch metrics", err),
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_environment(&mut self) {
        match self.client.get_env().await {
            Ok(environment) => {
                self.snapshot.environment = Some(environment);
                self.snapshot.touch();
            }
            Err(err) => self.record_error("fetch environment", err),
        }
    }

    pub async fn toggle_ready(&mut self, enable: bool) {
        self.toggle(ToggleTarget::Ready, enable).await;
    }

    pub async fn toggle_live(&mut self, enable: bool) {
        self.toggle(ToggleTarget::Live, enable).await;
    }

    /// Health is resynced only after the toggle call succeeded.
    #[instrument(skip(self))]
    pub async fn toggle(&mut self, target: ToggleTarget, enable: bool) {
        match health::apply_toggle(&self.client, target, enable).await {
            Ok(()) => self.fetch_health().await,
            Err(err) => self.record_error(&format!("toggle {target}"), err),
        }
    }

    #[instrument(skip(self))]
    pub async fn trigger_panic(&mut self) {
        match self.client.trigger_panic().await {
            Ok(_) => info!("panic endpoint answered"),
            Err(err) => self.record_error("trigger panic", err),
        }
    }

    /// Run every fetch in turn, as the polling loop does.
    pub async fn refresh_all(&mut self) {
        self.loading = true;
        self.fetch_version().await;
        self.fetch_health().await;
        self.fetch_metrics().await;
        self.fetch_environment().await;
        self.loading = false;
    }

    pub fn snapshot(&self) -> &ApplicationSnapshot {
        &self.snapshot
    }

    pub fn health(&self) -> HealthState {
        self.snapshot.health
    }

    pub fn is_healthy(&self) -> bool {
        self.snapshot.is_healthy()
    }

    pub fn health_status(&self) -> DerivedStatus {
        self.snapshot.health_status()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.snapshot.last_error.as_deref()
    }

    pub fn version(&self) -> Option<&VersionInfo> {
        self.snapshot.version.as_ref()
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.snapshot.metrics.as_ref()
    }

    pub fn environment(&self) -> Option<&EnvironmentInfo> {
        self.snapshot.environment.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn clear_error(&mut self) {
        self.snapshot.last_error = None;
    }

    fn record_error(&mut self, action: &str, err: impl Display) {
        error!(error = %err, "Failed to {action}");
        self.snapshot.last_error = Some(err.to_string());
    }
}
