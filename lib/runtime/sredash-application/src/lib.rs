//! Dashboard use cases: the probe client, health aggregation and the state
//! store.

pub mod client;
pub mod config;
pub mod health;
pub mod store;

pub use client::ProbeClient;
pub use config::{BuildSource, EnvSource, JsonFileSource, RUNTIME_CONFIG_VAR, default_config, layered_config};
pub use health::{ToggleTarget, apply_toggle, fetch_health, fetch_probe_results, probe_result};
pub use store::Dashboard;
