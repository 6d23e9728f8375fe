//! OpenWhisk client over the platform's REST API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::WhiskConfig;
use crate::payload::RequestPayload;

use super::service::InvocationService;
use super::types::{ActionSpec, Invocation, InvocationError, InvocationHandle};

/// Body returned by a non-blocking invoke
#[derive(Debug, Deserialize)]
struct ActivationAccepted {
    #[serde(rename = "activationId")]
    activation_id: String,
}

/// The part of an activation record that tells whether the action succeeded
#[derive(Debug, Deserialize)]
struct ActivationRecord {
    response: ActivationResponse,
}

#[derive(Debug, Deserialize)]
struct ActivationResponse {
    #[serde(default)]
    status: String,
    success: bool,
    #[serde(default)]
    result: Option<Value>,
}

/// OpenWhisk client
///
/// `reqwest::Client` pools connections internally and is safe to share, so one
/// `WhiskClient` serves every concurrent invocation task.
pub struct WhiskClient {
    http: reqwest::Client,
    namespace_url: String,
    credentials: Option<(String, String)>,
}

impl WhiskClient {
    /// Build a client from configuration
    pub fn new(config: &WhiskConfig) -> Result<Self, InvocationError> {
        let credentials = match config.auth.as_deref() {
            Some(auth) => Some(parse_credentials(auth)?),
            None => None,
        };

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        let namespace_url = format!(
            "{}/api/v1/namespaces/{}",
            normalize_api_host(&config.api_host),
            config.namespace
        );
        info!("Initialized OpenWhisk client for {}", namespace_url);

        Ok(Self {
            http,
            namespace_url,
            credentials,
        })
    }

    fn action_url(&self, name: &str) -> String {
        format!("{}/actions/{}", self.namespace_url, name)
    }

    fn activation_url(&self, handle: &InvocationHandle) -> String {
        format!("{}/activations/{}", self.namespace_url, handle)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((user, key)) => builder.basic_auth(user, Some(key)),
            None => builder,
        }
    }
}

#[async_trait]
impl InvocationService for WhiskClient {
    async fn create_action(&self, spec: &ActionSpec) -> Result<(), InvocationError> {
        let body = json!({
            "namespace": "_",
            "name": spec.name,
            "exec": { "kind": spec.kind, "image": spec.image },
            "limits": { "concurrency": spec.concurrency, "timeout": spec.timeout_ms },
        });

        let resp = self
            .request(Method::PUT, &self.action_url(&spec.name))
            .query(&[("overwrite", "false")])
            .json(&body)
            .send()
            .await?;
        let text = into_text(resp).await?;
        info!("Create action {} response: {}", spec.name, text);
        Ok(())
    }

    async fn invoke_action(
        &self,
        name: &str,
        payload: &RequestPayload,
    ) -> Result<Invocation, InvocationError> {
        let resp = self
            .request(Method::POST, &self.action_url(name))
            .query(&[("blocking", "false"), ("result", "false")])
            .json(payload)
            .send()
            .await?;
        let raw_response = into_text(resp).await?;

        let accepted: ActivationAccepted = serde_json::from_str(&raw_response)
            .map_err(|e| InvocationError::Decode(format!("{}: {}", e, raw_response)))?;
        let handle = InvocationHandle::new(accepted.activation_id);
        debug!("Invoked {} -> activation {}", name, handle);

        Ok(Invocation {
            handle,
            raw_response,
        })
    }

    async fn fetch_result(&self, handle: &InvocationHandle) -> Result<String, InvocationError> {
        let resp = self
            .request(Method::GET, &self.activation_url(handle))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(InvocationError::NotReady(handle.clone()));
        }
        let body = into_text(resp).await?;

        let record: ActivationRecord = serde_json::from_str(&body)
            .map_err(|e| InvocationError::Decode(format!("{}: {}", e, body)))?;
        if !record.response.success {
            warn!(
                "Activation {} finished with status {}",
                handle, record.response.status
            );
            return Err(InvocationError::ActivationFailed {
                handle: handle.clone(),
                status: record.response.status,
                result: record
                    .response
                    .result
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            });
        }
        Ok(body)
    }

    async fn delete_action(&self, name: &str) -> Result<(), InvocationError> {
        let resp = self
            .request(Method::DELETE, &self.action_url(name))
            .send()
            .await?;
        let text = into_text(resp).await?;
        info!("Delete action {} response: {}", name, text);
        Ok(())
    }
}

/// Read the body, mapping non-success statuses to `Rejected`
async fn into_text(resp: Response) -> Result<String, InvocationError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(InvocationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Split a `user:key` auth string
fn parse_credentials(auth: &str) -> Result<(String, String), InvocationError> {
    auth.split_once(':')
        .map(|(user, key)| (user.to_string(), key.to_string()))
        .ok_or_else(|| InvocationError::InvalidConfig("WHISK_AUTH must be in user:key form".into()))
}

/// Add a scheme if missing and drop trailing slashes
fn normalize_api_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}
