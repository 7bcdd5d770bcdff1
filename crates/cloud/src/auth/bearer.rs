//! Bearer-token authentication.

use chrono::Utc;

use crate::auth::{AccessToken, CloudAuth};
use crate::error::{CloudError, Result};

/// Adds `Authorization: Bearer <token>` and, when set, the
/// `x-goog-user-project` header naming the project billed for the call.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: AccessToken,
    user_project: Option<String>,
}

impl BearerAuth {
    pub fn new(token: AccessToken) -> Self {
        Self {
            token,
            user_project: None,
        }
    }

    /// Bill requests to `project`.
    pub fn with_user_project(mut self, project: impl Into<String>) -> Self {
        self.user_project = Some(project.into());
        self
    }
}

impl CloudAuth for BearerAuth {
    fn sign_request(
        &self,
        _url: &str,
        _method: &str,
        headers: &mut Vec<(String, String)>,
    ) -> Result<()> {
        if self.token.is_expired(Utc::now()) {
            return Err(CloudError::Auth(format!(
                "access token expired at {}",
                self.token.expires_at
            )));
        }

        headers.push((
            "Authorization".to_string(),
            format!("Bearer {}", self.token.value),
        ));

        if let Some(ref project) = self.user_project {
            headers.push(("x-goog-user-project".to_string(), project.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn adds_bearer_and_project_headers() {
        let token = AccessToken::new("ya29.test", Utc::now() + Duration::minutes(30));
        let auth = BearerAuth::new(token).with_user_project("my-project");

        let mut headers = Vec::new();
        auth.sign_request("https://example.com", "POST", &mut headers)
            .unwrap();

        assert_eq!(
            headers,
            vec![
                ("Authorization".to_string(), "Bearer ya29.test".to_string()),
                ("x-goog-user-project".to_string(), "my-project".to_string()),
            ]
        );
    }

    #[test]
    fn expired_token_is_an_auth_error() {
        let token = AccessToken::new("old", Utc::now() - Duration::seconds(1));
        let auth = BearerAuth::new(token);

        let mut headers = Vec::new();
        let err = auth
            .sign_request("https://example.com", "POST", &mut headers)
            .unwrap_err();
        assert!(matches!(err, CloudError::Auth(_)));
        assert!(headers.is_empty());
    }

    #[test]
    fn debug_output_hides_the_token() {
        let token = AccessToken::new("secret-value", Utc::now());
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
