use std::time::Duration;

use reqwest::Method;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PluginManagerError, Result};
use crate::model::entry::{Action, ActionReply, ActionRequest, PluginEntry};

/// Server API path for querying and modifying plugins.
pub const PLUGIN_API_PATH: &str = "lab/api/plugins";

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888/".to_string(),
            token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Issues enable/disable requests against the plugins endpoint.
#[async_trait::async_trait]
pub trait ActionClient: Send + Sync {
    async fn perform(&self, action: Action, plugin_id: &str) -> Result<ActionReply>;
}

/// HTTP client for `lab/api/plugins`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    settings: ServerSettings,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(settings: ServerSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| PluginManagerError::Network(err.to_string()))?;

        Ok(Self { settings, http })
    }

    pub fn endpoint(&self) -> String {
        join_url(&self.settings.base_url, PLUGIN_API_PATH)
    }

    pub async fn list_plugins(&self) -> Result<Vec<PluginEntry>> {
        self.request_api(Method::GET, None).await
    }

    /// Calls the plugin API and interprets the body as JSON.
    ///
    /// A body that is not JSON is logged and handed to the caller as a JSON
    /// string; a non-2xx status is always an error.
    async fn request_api<T: DeserializeOwned>(&self, method: Method, body: Option<Value>) -> Result<T> {
        let url = self.endpoint();
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.settings.token.as_deref() {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|err| PluginManagerError::Network(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| PluginManagerError::Network(err.to_string()))?;

        let data = parse_body(&text, status.as_u16());

        if !status.is_success() {
            let message = data
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| data.as_str().filter(|s| !s.is_empty()).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            tracing::warn!("{method} {url} failed with {status}: {message}");
            return Err(PluginManagerError::Response {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_value(data).map_err(|err| PluginManagerError::Response {
            status: status.as_u16(),
            message: format!("unexpected response body: {err}"),
        })
    }
}

#[async_trait::async_trait]
impl ActionClient for ApiClient {
    async fn perform(&self, action: Action, plugin_id: &str) -> Result<ActionReply> {
        let body = serde_json::to_value(ActionRequest {
            cmd: action,
            plugin_name: plugin_id,
        })
        .map_err(|err| PluginManagerError::Encode(err.to_string()))?;

        tracing::info!("requesting {action} for {plugin_id}");
        let reply = match self.request_api::<Value>(Method::POST, Some(body)).await? {
            Value::Null => ActionReply::default(),
            value => match serde_json::from_value(value) {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::debug!("ignoring unrecognised reply to {action} {plugin_id}: {err}");
                    ActionReply::default()
                }
            },
        };

        Ok(reply)
    }
}

fn parse_body(text: &str, status: u16) -> Value {
    if text.is_empty() {
        return Value::Null;
    }

    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("not a JSON response body (status {status}): {err}");
            Value::String(text.to_string())
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
