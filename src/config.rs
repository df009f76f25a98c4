//! Configuration loading and workspace setup
//!
//! YAML configuration files are parsed into a [`ConfigMap`], a thin wrapper
//! over the YAML value tree with typed accessors and dotted-path lookup.

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// A parsed configuration mapping with typed, path-aware accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMap {
    root: Value,
}

impl ConfigMap {
    /// Wrap a parsed YAML value.
    ///
    /// The root must be a non-empty mapping; null values, empty mappings,
    /// scalars, and sequences are rejected.
    pub fn from_value(root: Value) -> Result<Self> {
        match &root {
            Value::Null => Err(PipelineError::ConfigError(
                "configuration is empty".to_string(),
            )),
            Value::Mapping(m) if m.is_empty() => Err(PipelineError::ConfigError(
                "configuration is empty".to_string(),
            )),
            Value::Mapping(_) => Ok(Self { root }),
            other => Err(PipelineError::ConfigError(format!(
                "configuration root must be a mapping (found {})",
                value_kind(other)
            ))),
        }
    }

    /// Get a top-level entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Get a nested entry via a dotted path, e.g. `"training.n_trials"`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Get a string entry by dotted path.
    pub fn get_str(&self, path: &str) -> Result<&str> {
        self.get_path(path)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(path, "string"))
    }

    /// Get a float entry by dotted path. Integer values are widened.
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        self.get_path(path)
            .and_then(Value::as_f64)
            .ok_or_else(|| missing(path, "float"))
    }

    /// Get an integer entry by dotted path.
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        self.get_path(path)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing(path, "integer"))
    }

    /// Get a boolean entry by dotted path.
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        self.get_path(path)
            .and_then(Value::as_bool)
            .ok_or_else(|| missing(path, "boolean"))
    }

    /// Get a nested mapping as its own `ConfigMap`.
    pub fn section(&self, key: &str) -> Result<ConfigMap> {
        let value = self
            .get(key)
            .ok_or_else(|| missing(key, "section"))?
            .clone();
        match value {
            Value::Mapping(_) => Ok(Self { root: value }),
            other => Err(PipelineError::ConfigError(format!(
                "config key '{key}' is not a mapping (found {})",
                value_kind(&other)
            ))),
        }
    }

    /// Deserialize the whole configuration into a typed struct.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_yaml::from_value(self.root)?)
    }

    /// Borrow the underlying YAML value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

fn missing(path: &str, kind: &str) -> PipelineError {
    PipelineError::ConfigError(format!("missing or non-{kind} config key '{path}'"))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Read a YAML configuration file.
///
/// A file that parses to null (e.g. an empty file), to an empty mapping, or
/// to a non-mapping root is rejected with a config error naming the file;
/// IO and parse failures propagate unchanged.
pub fn read_yaml(path: impl AsRef<Path>) -> Result<ConfigMap> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let root: Value = serde_yaml::from_str(&content)?;
    ConfigMap::from_value(root).map_err(|err| match err {
        PipelineError::ConfigError(msg) => {
            PipelineError::ConfigError(format!("{msg}: {}", path.display()))
        }
        other => other,
    })
}

/// Create a list of directories, ignoring the ones that already exist.
pub fn create_directories<P: AsRef<Path>>(paths: &[P], verbose: bool) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        if verbose {
            info!(path = %path.display(), "created directory");
        }
    }
    Ok(())
}
