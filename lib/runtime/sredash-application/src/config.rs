//! Configuration sources backed by the process environment, the runtime
//! overrides file and values baked in at compile time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{debug, warn};

use sredash_domain::{ConfigKey, ConfigSource, LayeredConfig, StaticSource};

/// Names the runtime overrides file.
pub const RUNTIME_CONFIG_VAR: &str = "SREDASH_RUNTIME_CONFIG";

/// Values of the recognised variables, captured once.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    values: BTreeMap<ConfigKey, String>,
}

impl EnvSource {
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                ConfigKey::from_env_name(name.as_ref()).map(|key| (key, value.into()))
            })
            .collect();
        Self { values }
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: ConfigKey) -> Option<String> {
        self.values.get(&key).cloned()
    }
}

/// JSON object of overrides keyed by variable name, read at startup.
///
/// Strings are taken as-is; numbers and booleans are rendered; anything else
/// is ignored.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    values: BTreeMap<ConfigKey, String>,
}

impl JsonFileSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runtime config at {}", path.display()))?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: impl Into<PathBuf>, raw: &str) -> Result<Self> {
        let path = path.into();
        let document: Value = serde_json::from_str(raw)
            .with_context(|| format!("Runtime config at {} is not valid JSON", path.display()))?;
        let Value::Object(entries) = document else {
            bail!("Runtime config at {} must be a JSON object", path.display());
        };

        let mut values = BTreeMap::new();
        for (name, value) in entries {
            let Some(key) = ConfigKey::from_env_name(&name) else {
                debug!(%name, "ignoring unknown runtime config key");
                continue;
            };
            let rendered = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => continue,
            };
            values.insert(key, rendered);
        }
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for JsonFileSource {
    fn name(&self) -> &str {
        "runtime"
    }

    fn get(&self, key: ConfigKey) -> Option<String> {
        self.values.get(&key).cloned()
    }
}

/// Values captured from the build environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSource;

impl ConfigSource for BuildSource {
    fn name(&self) -> &str {
        "build"
    }

    fn get(&self, key: ConfigKey) -> Option<String> {
        let value = match key {
            ConfigKey::ApiUrl => option_env!("SREDASH_API_URL"),
            ConfigKey::CollectorUrl => option_env!("SREDASH_OTEL_COLLECTOR_URL"),
            ConfigKey::UptraceDsn => option_env!("SREDASH_UPTRACE_DSN"),
            ConfigKey::Environment => option_env!("SREDASH_ENVIRONMENT"),
        };
        value.map(str::to_string)
    }
}

/// Build the standard chain: flags, process env, runtime overrides file,
/// build-time values. A runtime file that cannot be loaded is skipped.
pub fn layered_config(flags: StaticSource, env: EnvSource, runtime_file: Option<&Path>) -> LayeredConfig {
    let mut config = LayeredConfig::default();
    config.push(flags);
    config.push(env);
    if let Some(path) = runtime_file {
        match JsonFileSource::load(path) {
            Ok(source) => config.push(source),
            Err(err) => warn!(error = %format!("{err:#}"), "runtime config ignored"),
        }
    }
    config.push(BuildSource);
    config
}

/// [`layered_config`] over the live process environment.
pub fn default_config(flags: StaticSource) -> LayeredConfig {
    let runtime_file = std::env::var_os(RUNTIME_CONFIG_VAR).map(PathBuf::from);
    layered_config(flags, EnvSource::capture(), runtime_file.as_deref())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_env_source_ignores_unrelated_vars() {
        let env = EnvSource::from_vars([
            ("SREDASH_API_URL", "http://api:8080"),
            ("HOME", "/root"),
        ]);
        assert_eq!(env.get(ConfigKey::ApiUrl).as_deref(), Some("http://api:8080"));
        assert_eq!(env.get(ConfigKey::Environment), None);
    }

    #[test]
    fn test_json_source_reads_known_keys() {
        let source = JsonFileSource::parse(
            "runtime.json",
            r#"{"SREDASH_ENVIRONMENT":"staging","SREDASH_API_URL":"http://backend:8080","OTHER":"x","SREDASH_UPTRACE_DSN":null}"#,
        )
        .unwrap();
        assert_eq!(source.get(ConfigKey::Environment).as_deref(), Some("staging"));
        assert_eq!(source.get(ConfigKey::ApiUrl).as_deref(), Some("http://backend:8080"));
        assert_eq!(source.get(ConfigKey::UptraceDsn), None);
    }

    #[test]
    fn test_json_source_rejects_non_object() {
        let err = JsonFileSource::parse("runtime.json", "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn test_layering_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"SREDASH_ENVIRONMENT":"staging","SREDASH_OTEL_COLLECTOR_URL":"http://collector:4318/v1/traces","SREDASH_API_URL":"http://runtime:8080"}}"#
        )
        .unwrap();

        let flags = StaticSource::new("flags").with(ConfigKey::ApiUrl, "http://flag:8080");
        let env = EnvSource::from_vars([
            ("SREDASH_API_URL", "http://env:8080"),
            ("SREDASH_ENVIRONMENT", "production"),
            ("SREDASH_OTEL_COLLECTOR_URL", "   "),
        ]);
        let config = layered_config(flags, env, Some(file.path()));

        assert_eq!(config.source_names(), vec!["flags", "env", "runtime", "build"]);
        assert_eq!(config.resolve(ConfigKey::ApiUrl).as_deref(), Some("http://flag:8080"));
        assert_eq!(
            config.lookup_with_origin(ConfigKey::Environment),
            Some(("production".to_string(), "env"))
        );
        let (collector, origin) = config.lookup_with_origin(ConfigKey::CollectorUrl).unwrap();
        assert_eq!(collector, "http://collector:4318/v1/traces");
        assert_eq!(origin, "runtime");
    }

    #[test]
    fn test_missing_runtime_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let config = layered_config(
            StaticSource::new("flags"),
            EnvSource::default(),
            Some(&missing),
        );
        assert_eq!(config.source_names(), vec!["flags", "env", "build"]);
    }
}
