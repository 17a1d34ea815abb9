use serde::Deserialize;
use std::{fs, net::SocketAddr, path::PathBuf};

use crate::error::{DelayError, Result};

/// Settings for the inference service. Values come from an optional JSON
/// file (`DELAY_CONFIG`) and are then overridden by environment variables.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub local_model_path: PathBuf,
    /// Remote artifact location; only reported, fetching happens elsewhere.
    pub gcp_bucket_name: Option<String>,
    pub gcp_model_path: Option<String>,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            local_model_path: PathBuf::from("logreg.json"),
            gcp_bucket_name: None,
            gcp_model_path: None,
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| DelayError::Config(format!("failed to read {}: {}", path, e)))?;
        serde_json::from_str(&data)
            .map_err(|e| DelayError::Config(format!("invalid config JSON in {}: {}", path, e)))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which stands in for the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("DELAY_CONFIG") {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        if let Some(v) = lookup("LOCAL_MODEL_PATH") {
            cfg.local_model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GCP_BUCKET_NAME") {
            cfg.gcp_bucket_name = Some(v);
        }
        if let Some(v) = lookup("GCP_MODEL_PATH") {
            cfg.gcp_model_path = Some(v);
        }
        if let Some(v) = lookup("BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = lookup("PORT") {
            cfg.port = v
                .parse()
                .map_err(|_| DelayError::Config(format!("PORT must be a port number, got {:?}", v)))?;
        }

        Ok(cfg)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|e| DelayError::Config(format!("invalid bind address {}: {}", self.bind_addr, e)))
    }

    pub fn remote_artifact(&self) -> Option<String> {
        match (&self.gcp_bucket_name, &self.gcp_model_path) {
            (Some(bucket), Some(path)) => Some(format!("gs://{}/{}", bucket, path)),
            _ => None,
        }
    }
}
