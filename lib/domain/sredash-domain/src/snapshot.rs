use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::health::{DerivedStatus, HealthState};
use crate::info::{EnvironmentInfo, VersionInfo};
use crate::metrics::MetricsSnapshot;

/// Everything the dashboard currently knows about the backend.
///
/// Each field is replaced independently; a failed refresh leaves the previous
/// value in place and only touches `last_error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplicationSnapshot {
    pub version: Option<VersionInfo>,
    pub health: HealthState,
    pub metrics: Option<MetricsSnapshot>,
    pub environment: Option<EnvironmentInfo>,
    pub last_error: Option<String>,
    pub updated_at_ms: u64,
}

impl ApplicationSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    pub fn health_status(&self) -> DerivedStatus {
        self.health.status()
    }

    pub fn touch(&mut self) {
        self.updated_at_ms = now_millis();
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default()
}
