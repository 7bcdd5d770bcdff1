//! HTTP client wrapper with request signing and optional retry.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::CloudAuth;
use crate::error::{CloudError, Result};

/// Status and body of a completed request.
pub struct HttpResponse {
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// HTTP client for JSON calls to the compute service.
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            max_retries,
        })
    }

    /// The underlying reqwest client, for unsigned calls such as the
    /// token exchange.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// POST `body` as JSON to `url`, signed by `auth`.
    ///
    /// Non-2xx statuses are returned, not turned into errors; callers
    /// decode service-specific error bodies.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        auth: &dyn CloudAuth,
    ) -> Result<HttpResponse> {
        let mut auth_headers = Vec::new();
        auth.sign_request(url, "POST", &mut auth_headers)?;

        let mut req = self.client.post(url).json(body);
        for (key, value) in &auth_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = self.execute_with_retry(req).await?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CloudError::Network(format!("reading response body: {e}")))?;

        debug!(%url, %status, bytes = body.len(), "POST completed");
        Ok(HttpResponse { status, body })
    }

    /// Execute a request, retrying timeouts and connection failures with
    /// exponential backoff.
    async fn execute_with_retry(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let Some(cloned) = request.try_clone() else {
                return request.send().await;
            };

            match cloned.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = Duration::from_millis(500 * (1 << (attempt - 1)));
                    warn!(attempt, ?backoff, error = %e, "transient HTTP failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, BearerAuth};
    use chrono::{Duration as ChronoDuration, Utc};

    fn auth(valid_for: i64) -> BearerAuth {
        BearerAuth::new(AccessToken::new(
            "ya29.test",
            Utc::now() + ChronoDuration::seconds(valid_for),
        ))
    }

    /// A local address with nothing listening on it.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/v1/projects/p/value:compute")
    }

    #[tokio::test]
    async fn expired_token_fails_before_sending() {
        let client = HttpClient::new(Duration::from_secs(5), 0).unwrap();
        let err = client
            .post_json(&closed_port_url(), &serde_json::json!({}), &auth(-60))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CloudError::Auth(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_an_http_error() {
        let client = HttpClient::new(Duration::from_secs(5), 1).unwrap();
        let err = client
            .post_json(&closed_port_url(), &serde_json::json!({}), &auth(3600))
            .await
            .err()
            .unwrap();
        match err {
            CloudError::Http(e) => assert!(e.is_connect()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
