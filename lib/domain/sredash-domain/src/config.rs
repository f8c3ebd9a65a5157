//! Layered configuration lookup.
//!
//! Sources are queried in the order they were added; the first non-empty value
//! wins. Keys with a documented default fall back to it when no source has a
//! value.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    ApiUrl,
    CollectorUrl,
    UptraceDsn,
    Environment,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        Self::ApiUrl,
        Self::CollectorUrl,
        Self::UptraceDsn,
        Self::Environment,
    ];

    /// Variable name used by environment-backed sources and override files.
    pub fn env_name(self) -> &'static str {
        match self {
            Self::ApiUrl => "SREDASH_API_URL",
            Self::CollectorUrl => "SREDASH_OTEL_COLLECTOR_URL",
            Self::UptraceDsn => "SREDASH_UPTRACE_DSN",
            Self::Environment => "SREDASH_ENVIRONMENT",
        }
    }

    pub fn default_value(self) -> Option<&'static str> {
        match self {
            Self::ApiUrl => Some("http://localhost:8080"),
            Self::CollectorUrl => Some("http://localhost:4318/v1/traces"),
            Self::UptraceDsn => None,
            Self::Environment => Some("development"),
        }
    }

    pub fn from_env_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.env_name() == name)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_name())
    }
}

pub trait ConfigSource: Send + Sync {
    /// Short label used in diagnostics, e.g. `env` or `build`.
    fn name(&self) -> &str;

    fn get(&self, key: ConfigKey) -> Option<String>;
}

/// Fixed key/value source, used for command-line overrides and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    values: BTreeMap<ConfigKey, String>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: ConfigKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn set(&mut self, key: ConfigKey, value: Option<String>) {
        match value {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }
}

impl ConfigSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: ConfigKey) -> Option<String> {
        self.values.get(&key).cloned()
    }
}

#[derive(Default)]
pub struct LayeredConfig {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfig {
    pub fn new(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }

    /// Append a source with lower priority than every existing one.
    pub fn push(&mut self, source: impl ConfigSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Insert a source with higher priority than every existing one.
    pub fn push_front(&mut self, source: impl ConfigSource + 'static) {
        self.sources.insert(0, Box::new(source));
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// First non-blank value across sources, without defaults.
    pub fn lookup(&self, key: ConfigKey) -> Option<String> {
        self.lookup_with_origin(key).map(|(value, _)| value)
    }

    /// Like [`LayeredConfig::lookup`], also naming the source that answered.
    pub fn lookup_with_origin(&self, key: ConfigKey) -> Option<(String, &str)> {
        self.sources.iter().find_map(|source| {
            source
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (value, source.name()))
        })
    }

    pub fn resolve(&self, key: ConfigKey) -> Option<String> {
        self.lookup(key)
            .or_else(|| key.default_value().map(str::to_string))
    }
}

impl fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("sources", &self.source_names())
            .finish()
    }
}
