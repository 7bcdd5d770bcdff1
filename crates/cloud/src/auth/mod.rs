//! Authentication for Earth Engine requests.
//!
//! A service-account key is exchanged once for an OAuth access token
//! ([`service_account`]); the token then signs every request
//! ([`BearerAuth`]). Tokens are not refreshed.

mod bearer;
pub mod service_account;

pub use bearer::BearerAuth;
pub use service_account::{ServiceAccountKey, EARTH_ENGINE_SCOPE};

use chrono::{DateTime, Utc};

use crate::error::Result;

/// Trait for signing HTTP requests to the compute service.
///
/// Implementations add authentication headers (e.g. Bearer tokens) to
/// outgoing requests before they are sent.
pub trait CloudAuth: Send + Sync {
    /// Sign a request by adding authentication headers.
    ///
    /// `url` is the full request URL, `headers` collects the headers to
    /// attach.
    fn sign_request(
        &self,
        url: &str,
        method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()>;
}

/// An OAuth access token and its expiry.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
