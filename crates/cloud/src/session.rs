//! Blocking session API.
//!
//! [`ComputeService`] is the seam between graph building and evaluation:
//! the driver only talks to this trait, so tests substitute a stub and the
//! binary passes an [`EeSession`].

use tracing::debug;

use crate::auth::{CloudAuth, ServiceAccountKey};
use crate::config::EeConfig;
use crate::ee::Deferred;
use crate::ee_client::EeClient;
use crate::error::{CloudError, Result};
use crate::graph::Expression;

/// Something that can evaluate expression graphs.
pub trait ComputeService {
    /// Evaluate a flattened expression (one round trip).
    fn compute_value(&self, expression: &Expression) -> Result<serde_json::Value>;

    /// Flatten and evaluate a deferred value.
    fn resolve(&self, value: &Deferred) -> Result<serde_json::Value> {
        let expression = Expression::new(value.node().clone())?;
        self.compute_value(&expression)
    }
}

/// Blocking wrapper around [`EeClient`].
///
/// Uses an internal single-threaded Tokio runtime, created once per
/// session.
pub struct EeSession {
    rt: tokio::runtime::Runtime,
    inner: EeClient,
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CloudError::Network(format!("failed to start runtime: {e}")))
}

impl EeSession {
    /// Read the configured key file and authenticate (blocking).
    pub fn connect(config: &EeConfig) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        Self::connect_with_key(config, &key)
    }

    /// Authenticate with an already loaded key (blocking).
    pub fn connect_with_key(config: &EeConfig, key: &ServiceAccountKey) -> Result<Self> {
        let rt = runtime()?;
        let inner = rt.block_on(EeClient::authenticate(config, key))?;
        Ok(Self { rt, inner })
    }

    /// Open a session with an existing authenticator; no token exchange.
    pub fn with_auth(config: &EeConfig, auth: Box<dyn CloudAuth>) -> Result<Self> {
        let rt = runtime()?;
        let inner = EeClient::new(config, auth)?;
        Ok(Self { rt, inner })
    }
}

impl ComputeService for EeSession {
    fn compute_value(&self, expression: &Expression) -> Result<serde_json::Value> {
        debug!(result = %expression.result, "evaluating expression");
        self.rt.block_on(self.inner.compute_value(expression))
    }
}

impl<S: ComputeService + ?Sized> ComputeService for &S {
    fn compute_value(&self, expression: &Expression) -> Result<serde_json::Value> {
        (**self).compute_value(expression)
    }
}
