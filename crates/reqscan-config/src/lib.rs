//! reqscan-config
//!
//! Read-only lookup of the tunables the rest of the workspace needs: the
//! three `scanner.*` keys, plus the storage DSN and pool size that the
//! daemon needs to open a `StorageAdapter`.
//!
//! Values are layered: an optional JSON snapshot (for tests and for
//! `reqscan-daemon --config`) is consulted first, falling back to an
//! environment variable per key. Nothing is cached across calls — each
//! getter re-reads the snapshot/env on every call.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing config key: {0}")]
    MissingKey(String),
    #[error("config key {key} has the wrong type (expected {expected})")]
    WrongType { key: String, expected: &'static str },
    #[error("config key {key} failed to parse: {source}")]
    Parse {
        key: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Layered config accessor: an optional JSON snapshot plus env var fallback.
#[derive(Debug, Clone, Default)]
pub struct Config {
    snapshot: Value,
    env_overrides: HashMap<String, String>,
}

impl Config {
    /// Env-only accessor; no snapshot file.
    pub fn from_env() -> Self {
        Self {
            snapshot: Value::Null,
            env_overrides: HashMap::new(),
        }
    }

    /// Load and deep-merge JSON snapshot files in order (later wins).
    pub fn load(paths: &[&str]) -> Result<Self> {
        let mut merged = Value::Object(Default::default());
        for p in paths {
            let raw = fs::read_to_string(Path::new(p))
                .with_context(|| format!("read config file: {p}"))?;
            let v: Value =
                serde_json::from_str(&raw).with_context(|| format!("parse config json: {p}"))?;
            deep_merge(&mut merged, v);
        }
        Ok(Self {
            snapshot: merged,
            env_overrides: HashMap::new(),
        })
    }

    /// Test/daemon helper: set a single override, bypassing both snapshot and env.
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env_overrides.insert(key.to_string(), value.into());
        self
    }

    fn raw(&self, key: &str) -> Option<String> {
        if let Some(v) = self.env_overrides.get(key) {
            return Some(v.clone());
        }
        let pointer = format!("/{}", key.replace('.', "/"));
        if let Some(v) = self.snapshot.pointer(&pointer) {
            return Some(match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }
        let env_name = key.to_uppercase().replace('.', "_");
        std::env::var(env_name).ok()
    }

    fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self
            .raw(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        raw.parse::<i64>().map_err(|source| ConfigError::Parse {
            key: key.to_string(),
            source,
        })
    }

    fn get_f64(&self, key: &str) -> Result<f64, ConfigError> {
        let raw = self
            .raw(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        raw.parse::<f64>().map_err(|_| ConfigError::WrongType {
            key: key.to_string(),
            expected: "number",
        })
    }

    /// `scanner.max_concurrent_request` — upper bound on in-flight outbound requests.
    pub fn max_concurrent_request(&self) -> Result<usize, ConfigError> {
        let n = self.get_i64("scanner.max_concurrent_request")?;
        if n <= 0 {
            return Err(ConfigError::WrongType {
                key: "scanner.max_concurrent_request".to_string(),
                expected: "positive integer",
            });
        }
        Ok(n as usize)
    }

    /// `scanner.request_timeout` — per-attempt deadline, in seconds.
    pub fn request_timeout_secs(&self) -> Result<f64, ConfigError> {
        self.get_f64("scanner.request_timeout")
    }

    /// `scanner.retry_times` — additional attempts after the first.
    pub fn retry_times(&self) -> Result<u32, ConfigError> {
        let n = self.get_i64("scanner.retry_times")?;
        if n < 0 {
            return Err(ConfigError::WrongType {
                key: "scanner.retry_times".to_string(),
                expected: "non-negative integer",
            });
        }
        Ok(n as u32)
    }

    /// `storage.database_url` — Postgres DSN consumed by the storage adapter.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        self.raw("storage.database_url")
            .ok_or_else(|| ConfigError::MissingKey("storage.database_url".to_string()))
    }

    /// `storage.max_connections` — pool size; defaults to 10 if unset.
    pub fn storage_max_connections(&self) -> u32 {
        self.get_i64("storage.max_connections")
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n as u32)
            .unwrap_or(10)
    }
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_env() {
        let cfg = Config::from_env().with_override("scanner.retry_times", "3");
        assert_eq!(cfg.retry_times().unwrap(), 3);
    }

    #[test]
    fn missing_key_is_an_error() {
        let cfg = Config::from_env();
        assert!(cfg.retry_times().is_err());
    }

    #[test]
    fn negative_retry_times_rejected() {
        let cfg = Config::from_env().with_override("scanner.retry_times", "-1");
        assert!(cfg.retry_times().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let cfg = Config::from_env().with_override("scanner.max_concurrent_request", "0");
        assert!(cfg.max_concurrent_request().is_err());
    }

    #[test]
    fn load_merges_snapshot_layers() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        let env = dir.path().join("env.json");
        fs::write(
            &base,
            r#"{"scanner": {"max_concurrent_request": 4, "retry_times": 2}}"#,
        )
        .unwrap();
        fs::write(&env, r#"{"scanner": {"retry_times": 5}}"#).unwrap();

        let cfg = Config::load(&[base.to_str().unwrap(), env.to_str().unwrap()]).unwrap();
        assert_eq!(cfg.max_concurrent_request().unwrap(), 4);
        assert_eq!(cfg.retry_times().unwrap(), 5);
    }
}
