use std::fmt::{Debug, Formatter};

use async_trait::async_trait;
use keyward::{BackendError, Fields, LogicalBackend, PolicyBackend, Reply};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{VaultBackendError, VaultConfig};

/// Header carrying the Vault token
pub const TOKEN_HEADER: &str = "X-Vault-Token";
/// Header carrying the Vault namespace
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// The envelope Vault wraps every response body in.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Fields>,
    #[serde(default)]
    auth: Option<Auth>,
}

#[derive(Deserialize)]
struct Auth {
    client_token: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// A [LogicalBackend] and [PolicyBackend] speaking Vault's HTTP API.
///
/// - GET `/v1/{path}` reads, GET `/v1/{path}?list=true` lists
/// - POST `/v1/{path}` writes, DELETE `/v1/{path}` deletes
/// - 404 is `Ok(None)` on reads and lists, `Ok(())` on deletes and
///   [BackendError::NotFound] on writes
/// - PUT and DELETE `/v1/sys/policies/acl/{name}` manage ACL policies
///
/// A client carries exactly one token; build one per caller (see
/// [crate::VaultClientFactory]).
#[derive(Clone)]
pub struct VaultBackend {
    base: Url,
    client: Client,
    token: Option<String>,
    namespace: Option<String>,
    headers: Vec<(String, String)>,
}

impl Debug for VaultBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultBackend")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("namespace", &self.namespace)
            .field("headers", &self.headers)
            .finish()
    }
}

impl VaultBackend {
    /// Create a client for the server in `config` that presents no token.
    pub fn new(config: &VaultConfig) -> Result<Self, VaultBackendError> {
        let base = config.base_url()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }
        let client = builder
            .build()
            .map_err(|error| VaultBackendError::ClientFailed(error.to_string()))?;

        Ok(Self {
            base,
            client,
            token: None,
            namespace: config.namespace.clone(),
            headers: Vec::new(),
        })
    }

    /// Present `token` on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send `headers` along with every request
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Whether this client presents a token
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Log in through the AppRole endpoint at `login_path`, returning the
    /// issued client token.
    pub async fn login(
        &self,
        login_path: &str,
        role_id: &str,
        secret_id: &str,
    ) -> Result<String, VaultBackendError> {
        let response = self
            .request(Method::POST, login_path)?
            .json(&json!({ "role_id": role_id, "secret_id": secret_id }))
            .send()
            .await?;
        let response = check(login_path, response).await?;
        let envelope = envelope(login_path, response).await?;

        envelope
            .auth
            .map(|auth| auth.client_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| VaultBackendError::MissingClientToken(login_path.to_string()))
    }

    /// The URL addressing `path` under the `/v1/` API prefix.
    pub fn url(&self, path: &str) -> Result<Url, VaultBackendError> {
        let relative = format!("v1/{}", path.trim_matches('/'));
        self.base
            .join(&relative)
            .map_err(|error| VaultBackendError::InvalidAddress {
                address: format!("{}{}", self.base, relative),
                reason: error.to_string(),
            })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, VaultBackendError> {
        let mut builder = self.client.request(method, self.url(path)?);

        if let Some(token) = &self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        if let Some(namespace) = &self.namespace {
            builder = builder.header(NAMESPACE_HEADER, namespace);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        Ok(builder)
    }

    async fn fetch(&self, path: &str, list: bool) -> Result<Option<Fields>, VaultBackendError> {
        let mut request = self.request(Method::GET, path)?;
        if list {
            request = request.query(&[("list", "true")]);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check(path, response).await?;
        let envelope = envelope(path, response).await?;
        Ok(Some(envelope.data.unwrap_or_default()))
    }

    async fn post(&self, path: &str, fields: Fields) -> Result<Option<Reply>, VaultBackendError> {
        let response = self
            .request(Method::POST, path)?
            .json(&fields)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VaultBackendError::NotFound {
                path: path.to_string(),
            });
        }
        let response = check(path, response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let envelope = envelope(path, response).await?;
        Ok(Some(Reply {
            data: envelope.data.unwrap_or_default(),
            client_token: envelope.auth.map(|auth| auth.client_token),
        }))
    }

    async fn remove(&self, path: &str) -> Result<(), VaultBackendError> {
        let response = self.request(Method::DELETE, path)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(path, response).await?;
        Ok(())
    }

    async fn put_acl(&self, name: &str, rules: &str) -> Result<(), VaultBackendError> {
        let path = policy_path(name);
        let response = self
            .request(Method::PUT, &path)?
            .json(&json!({ "policy": rules }))
            .send()
            .await?;
        check(&path, response).await?;
        Ok(())
    }
}

fn policy_path(name: &str) -> String {
    format!("sys/policies/acl/{name}")
}

/// Turn a non-success response into the matching error.
async fn check(path: &str, response: Response) -> Result<Response, VaultBackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::debug!(%path, status = status.as_u16(), "Vault denied access");
        return Err(VaultBackendError::PermissionDenied {
            path: path.to_string(),
        });
    }

    let body = response.bytes().await.unwrap_or_default();
    let ErrorBody { errors } = serde_json::from_slice(&body).unwrap_or_default();

    Err(VaultBackendError::Status {
        path: path.to_string(),
        status: status.as_u16(),
        errors,
    })
}

async fn envelope(path: &str, response: Response) -> Result<Envelope, VaultBackendError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|error| VaultBackendError::DecodeFailed {
        path: path.to_string(),
        reason: error.to_string(),
    })
}

#[async_trait]
impl LogicalBackend for VaultBackend {
    async fn read(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        Ok(self.fetch(path, false).await?)
    }

    async fn list(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        Ok(self.fetch(path, true).await?)
    }

    async fn write(&self, path: &str, fields: Fields) -> Result<Option<Reply>, BackendError> {
        Ok(self.post(path, fields).await?)
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        Ok(self.remove(path).await?)
    }
}

#[async_trait]
impl PolicyBackend for VaultBackend {
    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), BackendError> {
        Ok(self.put_acl(name, rules).await?)
    }

    async fn delete_policy(&self, name: &str) -> Result<(), BackendError> {
        Ok(self.remove(&policy_path(name)).await?)
    }
}
