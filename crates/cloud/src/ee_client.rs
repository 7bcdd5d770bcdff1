//! Async client for the Earth Engine REST API.
//!
//! Only `projects/{project}/value:compute` is used: the client posts a
//! flattened [`Expression`] and returns the computed JSON value.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::{BearerAuth, CloudAuth, ServiceAccountKey};
use crate::config::EeConfig;
use crate::error::{CloudError, Result};
use crate::graph::Expression;
use crate::http::HttpClient;

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: &'a Expression,
}

#[derive(Deserialize)]
struct ComputeResponse {
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Async Earth Engine client bound to one project and one credential.
pub struct EeClient {
    http: HttpClient,
    auth: Box<dyn CloudAuth>,
    compute_url: String,
}

impl EeClient {
    /// Create a client with an already-built authenticator.
    pub fn new(config: &EeConfig, auth: Box<dyn CloudAuth>) -> Result<Self> {
        let http = HttpClient::new(config.request_timeout, config.max_retries)?;
        Ok(Self {
            http,
            auth,
            compute_url: config.compute_url(),
        })
    }

    /// Exchange the service-account key for an access token and return a
    /// ready client.
    pub async fn authenticate(config: &EeConfig, key: &ServiceAccountKey) -> Result<Self> {
        let http = HttpClient::new(config.request_timeout, config.max_retries)?;
        let token = key.fetch_token(http.inner()).await?;

        info!(
            account = %key.client_email,
            project = %config.project_id,
            "Earth Engine authenticated"
        );

        let auth = BearerAuth::new(token).with_user_project(config.project_id.clone());
        Ok(Self {
            http,
            auth: Box::new(auth),
            compute_url: config.compute_url(),
        })
    }

    /// Evaluate an expression in one round trip.
    pub async fn compute_value(&self, expression: &Expression) -> Result<serde_json::Value> {
        debug!(nodes = expression.len(), url = %self.compute_url, "value:compute");

        let resp = self
            .http
            .post_json(&self.compute_url, &ComputeRequest { expression }, self.auth.as_ref())
            .await?;

        if !resp.status.is_success() {
            return Err(remote_error(resp.status, &resp.body));
        }

        let parsed: ComputeResponse = serde_json::from_str(&resp.body)
            .map_err(|e| CloudError::Decode(format!("parsing value:compute response: {e}")))?;
        Ok(parsed.result)
    }
}

/// Decode a Google API error body, falling back to the raw text.
fn remote_error(status: reqwest::StatusCode, body: &str) -> CloudError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => CloudError::Remote {
            code: if error.code == 0 { status.as_u16() } else { error.code },
            status: if error.status.is_empty() {
                status.to_string()
            } else {
                error.status
            },
            message: error.message,
        },
        Err(_) => CloudError::Remote {
            code: status.as_u16(),
            status: status.to_string(),
            message: body.chars().take(500).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn decodes_google_error_envelope() {
        let body = r#"{"error": {"code": 400, "message": "Image.select: Pattern 'B99' did not match any bands.", "status": "INVALID_ARGUMENT"}}"#;
        match remote_error(StatusCode::BAD_REQUEST, body) {
            CloudError::Remote { code, status, message } => {
                assert_eq!(code, 400);
                assert_eq!(status, "INVALID_ARGUMENT");
                assert!(message.contains("B99"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body() {
        match remote_error(StatusCode::BAD_GATEWAY, "<html>upstream down</html>") {
            CloudError::Remote { code, message, .. } => {
                assert_eq!(code, 502);
                assert_eq!(message, "<html>upstream down</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn compute_request_wraps_expression() {
        let expr = Expression::new(crate::graph::ValueNode::constant(1)).unwrap();
        let body = serde_json::to_value(ComputeRequest { expression: &expr }).unwrap();
        assert_eq!(body["expression"]["result"], "0");
        assert_eq!(body["expression"]["values"]["0"]["constantValue"], 1);
    }

    #[test]
    fn null_result_is_kept() {
        let parsed: ComputeResponse = serde_json::from_str(r#"{"result": null}"#).unwrap();
        assert!(parsed.result.is_null());
        let parsed: ComputeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.result.is_null());
    }
}
