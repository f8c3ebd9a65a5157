use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Build metadata reported by `/version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub commit: String,
    pub commit_short: String,
    pub build_time: String,
}

impl VersionInfo {
    /// `version (commit)` with whichever parts are known.
    pub fn display_label(&self) -> String {
        let commit = if self.commit_short.is_empty() {
            self.commit.as_str()
        } else {
            self.commit_short.as_str()
        };
        match (self.version.is_empty(), commit.is_empty()) {
            (true, true) => "unknown".to_string(),
            (false, true) => self.version.clone(),
            (true, false) => commit.to_string(),
            (false, false) => format!("{} ({commit})", self.version),
        }
    }
}

/// Opaque key/value payload from `/env`, kept in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentInfo(pub BTreeMap<String, Value>);

impl EnvironmentInfo {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_tolerates_missing_and_extra_fields() {
        let info: VersionInfo =
            serde_json::from_str(r#"{"version":"v1.4.0","commit_short":"abc123","extra":1}"#)
                .unwrap();
        assert_eq!(info.version, "v1.4.0");
        assert_eq!(info.commit, "");
        assert_eq!(info.display_label(), "v1.4.0 (abc123)");
        assert_eq!(VersionInfo::default().display_label(), "unknown");
    }

    #[test]
    fn test_environment_is_opaque_map() {
        let env: EnvironmentInfo =
            serde_json::from_str(r#"{"PORT":"8080","HOSTNAME":"pod-1","NESTED":{"a":1}}"#).unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(env.get_str("PORT"), Some("8080"));
        assert!(env.get_str("NESTED").is_none());
        assert_eq!(env.keys().collect::<Vec<_>>(), vec!["HOSTNAME", "NESTED", "PORT"]);
    }
}
