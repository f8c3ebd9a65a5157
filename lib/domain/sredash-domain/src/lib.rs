//! Domain models and invariants.

pub mod config;
pub mod health;
pub mod info;
pub mod metrics;
pub mod snapshot;

pub use config::{ConfigKey, ConfigSource, LayeredConfig, StaticSource};
pub use health::{DerivedStatus, HealthState, ProbeEndpoint, ProbeResult, SYNTHETIC_FAILURE_STATUS};
pub use info::{EnvironmentInfo, VersionInfo};
pub use metrics::{MetricFamily, MetricSample, MetricsSnapshot, parse_metrics};
pub use snapshot::{ApplicationSnapshot, now_millis};
