//! Process configuration read from environment variables.
//!
//! - `GOOGLE_APPLICATION_CREDENTIALS`: path to a service-account JSON key
//! - `GEE_PROJECT_ID`: Cloud project billed for Earth Engine requests
//! - `EE_API_URL` (optional): API root, defaults to the public endpoint
//! - `EE_TIMEOUT_SECS` (optional): per-request timeout, default 300
//! - `EE_MAX_RETRIES` (optional): retries on connect/timeout, default 0

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CloudError, Result};

pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const PROJECT_VAR: &str = "GEE_PROJECT_ID";
pub const API_URL_VAR: &str = "EE_API_URL";
pub const TIMEOUT_VAR: &str = "EE_TIMEOUT_SECS";
pub const RETRIES_VAR: &str = "EE_MAX_RETRIES";

pub const DEFAULT_API_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Earth Engine connection settings.
#[derive(Debug, Clone)]
pub struct EeConfig {
    pub credentials_path: PathBuf,
    pub project_id: String,
    pub api_url: String,
    /// Per-request timeout (default 300 s).
    pub request_timeout: Duration,
    /// Retries on connect/timeout failures (default 0).
    pub max_retries: u32,
}

impl EeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = get(CREDENTIALS_VAR);
        let project = get(PROJECT_VAR);
        let (credentials_path, project_id) = match (credentials, project) {
            (Some(c), Some(p)) => (PathBuf::from(c), p),
            (c, p) => {
                let missing: Vec<&str> = [(CREDENTIALS_VAR, c.is_none()), (PROJECT_VAR, p.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                return Err(CloudError::Config(format!(
                    "missing environment variable(s): {}",
                    missing.join(", ")
                )));
            }
        };

        let api_url = get(API_URL_VAR)
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs: u64 = parse_var(&get, TIMEOUT_VAR)?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CloudError::Config(format!("{TIMEOUT_VAR} must be at least 1")));
        }
        let max_retries: u32 = parse_var(&get, RETRIES_VAR)?.unwrap_or(0);

        Ok(Self {
            credentials_path,
            project_id,
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries,
        })
    }

    /// `POST` endpoint for `value:compute` in the configured project.
    pub fn compute_url(&self) -> String {
        format!("{}/v1/projects/{}/value:compute", self.api_url, self.project_id)
    }
}

fn parse_var<T, G>(get: &G, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| CloudError::Config(format!("{name}={raw:?}: {e}")))
        })
        .transpose()
}
