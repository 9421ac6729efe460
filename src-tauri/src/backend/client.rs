//! HTTP client for the backend worker's `/api` routes.
//!
//! Lifecycle calls (`init`, `shortcut_screenshot`) return typed results; the
//! tracking/report pass-through calls resolve to an [`ApiResponse`] so the
//! bridge can hand them straight to the frontend.

use crate::api::ApiResponse;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend initialization rejected with HTTP {status}")]
    InitRejected { status: u16 },

    #[error("Invalid backend URL '{0}'")]
    InvalidUrl(String),
}

/// Body of `POST /api/init`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    pub user_data_path: String,
    pub logs_path: String,
    pub is_dev: bool,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        // The worker is always on loopback; system proxy settings must not apply.
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[BACKEND] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self { http, base_url }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an `/api` route, e.g. `endpoint("/status")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Hand the backend its data directories. Anything but 200 is a rejection.
    pub async fn init(&self, request: &InitRequest) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.endpoint("/init"))
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        log::info!("[INIT] Backend initialization response: HTTP {}", status.as_u16());
        if status != StatusCode::OK {
            return Err(BackendError::InitRejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Fire the quick-screenshot route. The caller only logs the status.
    pub async fn shortcut_screenshot(&self) -> Result<StatusCode, BackendError> {
        let resp = self
            .http
            .post(self.endpoint("/shortcut_screenshot"))
            .send()
            .await?;
        Ok(resp.status())
    }

    pub async fn start_tracking(&self) -> ApiResponse<Value> {
        self.call(Method::POST, "/start_tracking", None).await
    }

    pub async fn stop_tracking(&self) -> ApiResponse<Value> {
        self.call(Method::POST, "/stop_tracking", None).await
    }

    pub async fn status(&self) -> ApiResponse<Value> {
        self.call(Method::GET, "/status", None).await
    }

    pub async fn events(&self) -> ApiResponse<Value> {
        self.call(Method::GET, "/events", None).await
    }

    /// `bbox` is `[left, top, right, bottom]` or `None` for the full screen.
    pub async fn take_screenshot(&self, bbox: Option<Vec<f64>>) -> ApiResponse<Value> {
        let body = serde_json::json!({ "bbox": bbox });
        self.call(Method::POST, "/take_screenshot", Some(&body)).await
    }

    pub async fn generate_report(&self, request: &Value) -> ApiResponse<Value> {
        self.call(Method::POST, "/generate_report", Some(request))
            .await
    }

    /// URL the frontend can load a stored screenshot from.
    ///
    /// The file path becomes a single percent-encoded path segment.
    pub fn screenshot_url(&self, filepath: &str) -> Result<String, BackendError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "screenshots", filepath]);
        Ok(url.into())
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResponse<Value> {
        match self.send(method, path, body).await {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("[BACKEND] {} failed: {}", path, e);
                ApiResponse::error(e.to_string())
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse<Value>, reqwest::Error> {
        let mut req = self.http.request(method, self.endpoint(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let message = match resp.json::<Value>().await {
                Ok(body) => body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string(),
                Err(_) => "Failed to parse error response.".to_string(),
            };
            return Ok(ApiResponse::error(format!(
                "API Error {}: {}",
                status.as_u16(),
                message
            )));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(ApiResponse::empty_success());
        }

        let body: Value = resp.json().await?;
        Ok(ApiResponse::from_body(body))
    }
}
