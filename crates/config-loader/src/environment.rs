use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::ConfigError;

pub const DOCKER_HOST_ALIAS_VAR: &str = "ECS_EMULATOR_DOCKER_HOST_ALIAS";
pub const DEFAULT_DOCKER_HOST_ALIAS: &str = "host.docker.internal";

static LOOPBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:127\.0\.0\.1|localhost)\b").expect("loopback pattern is valid")
});

/// A single `NAME=value` pair handed to the container runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Hostname containers use to reach services listening on the launching host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerHostAlias(String);

impl DockerHostAlias {
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn from_env() -> Self {
        match env::var(DOCKER_HOST_ALIAS_VAR) {
            Ok(alias) if !alias.trim().is_empty() => Self(alias.trim().to_string()),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DockerHostAlias {
    fn default() -> Self {
        Self(DEFAULT_DOCKER_HOST_ALIAS.to_string())
    }
}

/// Replaces every loopback host in `value` with the docker host alias.
pub fn rewrite_loopback(value: &str, alias: &DockerHostAlias) -> String {
    LOOPBACK.replace_all(value, alias.as_str()).into_owned()
}

/// Base environment for every launched task, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEnvironment {
    vars: Vec<EnvVar>,
}

impl TaskEnvironment {
    pub fn new(vars: Vec<EnvVar>) -> Self {
        Self { vars }
    }

    /// Loads the task environment file, rewriting loopback addresses.
    ///
    /// Files ending in `.yaml`/`.yml` are read as YAML, anything else as JSON.
    /// The document is either a mapping of names to scalar values or an
    /// ECS-style list of `{"name": .., "value": ..}` objects.
    pub fn load(path: &Path, alias: &DockerHostAlias) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::EnvFileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read task environment file: {}", e),
        })?;

        let document = parse_document(path, &content)?;
        let environment = Self::from_value(&document, alias)?;

        info!(
            path = %path.display(),
            variables = environment.len(),
            alias = alias.as_str(),
            "Loaded task environment"
        );
        Ok(environment)
    }

    pub fn from_value(document: &Value, alias: &DockerHostAlias) -> Result<Self, ConfigError> {
        let pairs = match document {
            Value::Object(map) => map
                .iter()
                .map(|(name, value)| Ok((name.clone(), scalar_to_string(name, value)?)))
                .collect::<Result<Vec<_>, ConfigError>>()?,
            Value::Array(entries) => entries
                .iter()
                .map(list_entry)
                .collect::<Result<Vec<_>, ConfigError>>()?,
            _ => return Err(ConfigError::UnsupportedShape),
        };

        let vars = pairs
            .into_iter()
            .map(|(name, value)| {
                let rewritten = rewrite_loopback(&value, alias);
                if rewritten != value {
                    debug!(%name, from = %value, to = %rewritten, "Rewrote loopback address");
                }
                EnvVar::new(name, rewritten)
            })
            .collect();

        Ok(Self { vars })
    }

    pub fn vars(&self) -> &[EnvVar] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigError> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    let parsed = if is_yaml {
        serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str::<Value>(content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::ParseFailed {
        path: path.to_string_lossy().to_string(),
        message,
    })
}

fn list_entry(entry: &Value) -> Result<(String, String), ConfigError> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or(ConfigError::UnsupportedShape)?;
    let value = entry.get("value").ok_or_else(|| ConfigError::InvalidValue {
        name: name.to_string(),
        message: "missing value".to_string(),
    })?;
    Ok((name.to_string(), scalar_to_string(name, value)?))
}

fn scalar_to_string(name: &str, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "null is not allowed".to_string(),
        }),
        Value::Array(_) | Value::Object(_) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: "nested values are not allowed".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn rewrite_loopback_replaces_ip_and_hostname() {
        let alias = DockerHostAlias::default();
        assert_eq!(
            rewrite_loopback("http://127.0.0.1:9000", &alias),
            "http://host.docker.internal:9000"
        );
        assert_eq!(
            rewrite_loopback("postgres://localhost:5432/db", &alias),
            "postgres://host.docker.internal:5432/db"
        );
        assert_eq!(rewrite_loopback("http://10.0.0.1:80", &alias), "http://10.0.0.1:80");
    }

    #[test]
    fn rewrite_loopback_uses_custom_alias() {
        let alias = DockerHostAlias::new("docker.for.mac.localhost");
        assert_eq!(
            rewrite_loopback("http://127.0.0.1:9000", &alias),
            "http://docker.for.mac.localhost:9000"
        );
    }

    #[test]
    fn rewrite_loopback_leaves_longer_words_alone() {
        let alias = DockerHostAlias::default();
        assert_eq!(rewrite_loopback("localhostname", &alias), "localhostname");
    }

    #[test]
    #[serial]
    fn alias_from_env_defaults_when_unset() {
        env::remove_var(DOCKER_HOST_ALIAS_VAR);
        assert_eq!(DockerHostAlias::from_env().as_str(), DEFAULT_DOCKER_HOST_ALIAS);

        env::set_var(DOCKER_HOST_ALIAS_VAR, "172.17.0.1");
        assert_eq!(DockerHostAlias::from_env().as_str(), "172.17.0.1");
        env::remove_var(DOCKER_HOST_ALIAS_VAR);
    }

    #[test]
    fn from_value_keeps_document_order() {
        let document = json!({ "ZED": "1", "ALPHA": "2", "MID": "3" });
        let environment =
            TaskEnvironment::from_value(&document, &DockerHostAlias::default()).unwrap();
        let names: Vec<&str> = environment.vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["ZED", "ALPHA", "MID"]);
    }

    #[test]
    fn from_value_accepts_name_value_list_and_scalars() {
        let document = json!([
            { "name": "PORT", "value": 8080 },
            { "name": "DEBUG", "value": true },
            { "name": "API", "value": "http://localhost:1" }
        ]);
        let environment =
            TaskEnvironment::from_value(&document, &DockerHostAlias::default()).unwrap();
        assert_eq!(
            environment.vars(),
            &[
                EnvVar::new("PORT", "8080"),
                EnvVar::new("DEBUG", "true"),
                EnvVar::new("API", "http://host.docker.internal:1"),
            ]
        );
    }

    #[test]
    fn from_value_rejects_nested_and_null_values() {
        let alias = DockerHostAlias::default();
        let nested = json!({ "A": { "b": 1 } });
        assert!(matches!(
            TaskEnvironment::from_value(&nested, &alias),
            Err(ConfigError::InvalidValue { .. })
        ));

        let null = json!({ "A": null });
        assert!(matches!(
            TaskEnvironment::from_value(&null, &alias),
            Err(ConfigError::InvalidValue { .. })
        ));

        assert!(matches!(
            TaskEnvironment::from_value(&json!("A=1"), &alias),
            Err(ConfigError::UnsupportedShape)
        ));
    }
}
