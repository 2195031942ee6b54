//! HTTP client for the hamald REST API.

use hamal_core::ProjectView;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Error reported by hamald, or a response that could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// hamald answered with `success: false`. `message` is its raw error
    /// text, which for orchestrator failures is the orchestrator's own body.
    #[error("{message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("unexpected response from hamald (HTTP {status}): {body}")]
    Malformed { status: u16, body: String },

    #[error("cannot reach hamald: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Server { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The `{success, data, error, code}` envelope every route answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    code: Option<String>,
}

/// Decode a response body into its `data`, or the server's error.
fn parse_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> ApiResult<T> {
    let malformed = || ApiError::Malformed {
        status: status.as_u16(),
        body: body.to_string(),
    };
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|_| malformed())?;
    if !envelope.success {
        return Err(ApiError::Server {
            status: status.as_u16(),
            code: envelope.code,
            message: envelope.error.unwrap_or_else(|| body.to_string()),
        });
    }
    envelope.data.ok_or_else(malformed)
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(server: &str) -> ApiResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: format!("{}/v1/hamal", server.trim_end_matches('/')),
            client,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "hamald request");
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        parse_envelope(status, &text)
    }

    pub async fn list(&self) -> ApiResult<Vec<ProjectView>> {
        self.call(Method::GET, "/projects", None).await
    }

    pub async fn status(&self, name: &str) -> ApiResult<ProjectView> {
        self.call(Method::GET, &format!("/projects/{name}"), None).await
    }

    pub async fn create(&self, plan: &Value) -> ApiResult<String> {
        self.call(Method::POST, "/projects", Some(plan)).await
    }

    pub async fn update(&self, plan: &Value) -> ApiResult<String> {
        self.call(Method::PUT, "/projects", Some(plan)).await
    }

    pub async fn delete(&self, name: &str) -> ApiResult<String> {
        self.call(Method::DELETE, &format!("/projects/{name}"), None).await
    }

    /// Returns the server's description of the step taken.
    pub async fn advance(&self, name: &str, app_id: &str) -> ApiResult<Value> {
        let body = serde_json::json!({ "app_id": app_id });
        self.call(
            Method::PUT,
            &format!("/projects/{name}/rollingupdate"),
            Some(&body),
        )
        .await
    }

    pub async fn rollback(&self, name: &str, app_id: &str) -> ApiResult<String> {
        let body = serde_json::json!({ "app_id": app_id });
        self.call(Method::PUT, &format!("/projects/{name}/rollback"), Some(&body))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_data() {
        let name: String =
            parse_envelope(StatusCode::CREATED, r#"{"success":true,"data":"shop"}"#).unwrap();
        assert_eq!(name, "shop");
    }

    #[test]
    fn error_envelope_keeps_raw_text_and_code() {
        let err = parse_envelope::<String>(
            StatusCode::BAD_GATEWAY,
            r#"{"success":false,"error":"{\"message\":\"app locked\"}","code":"orchestrator_error"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), r#"{"message":"app locked"}"#);
        assert_eq!(err.code(), Some("orchestrator_error"));
    }

    #[test]
    fn non_envelope_body_is_malformed() {
        let err = parse_envelope::<String>(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(matches!(err, ApiError::Malformed { status: 502, .. }));
        assert!(err.code().is_none());
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let client = ApiClient::new("http://hamal:5099/").unwrap();
        assert_eq!(client.base_url, "http://hamal:5099/v1/hamal");
    }
}
