use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::BackendError;

mod memory;
pub use memory::*;

mod measure;
pub use measure::*;

/// The key-value payload of a backend request or response.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A non-empty response to a write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Response data
    pub data: Fields,
    /// Client token issued by the write, if it was a login
    pub client_token: Option<String>,
}

impl Reply {
    /// A reply carrying only data.
    pub fn data(data: Fields) -> Self {
        Self {
            data,
            client_token: None,
        }
    }
}

/// A [LogicalBackend] is a facade over the path-addressed data operations of
/// a secret-management backend.
///
/// Absence is reported as `Ok(None)`, never as an error.
#[async_trait]
pub trait LogicalBackend: Send + Sync {
    /// Read the fields stored at `path`
    async fn read(&self, path: &str) -> Result<Option<Fields>, BackendError>;
    /// List the children of `path`; the result carries them under `keys`
    async fn list(&self, path: &str) -> Result<Option<Fields>, BackendError>;
    /// Write `fields` to `path`; `None` means the backend sent no body
    async fn write(&self, path: &str, fields: Fields) -> Result<Option<Reply>, BackendError>;
    /// Delete whatever is stored at `path`
    async fn delete(&self, path: &str) -> Result<(), BackendError>;
}

/// A [PolicyBackend] administers the named policies of a backend.
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Create or replace the policy `name` with `rules`
    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), BackendError>;
    /// Delete the policy `name`
    async fn delete_policy(&self, name: &str) -> Result<(), BackendError>;
}

/// Everything a [crate::CredentialProvider] needs from its backend.
pub trait Backend: LogicalBackend + PolicyBackend {}

impl<T> Backend for T where T: LogicalBackend + PolicyBackend {}

#[async_trait]
impl<T> LogicalBackend for Arc<T>
where
    T: LogicalBackend + ?Sized,
{
    async fn read(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        self.as_ref().read(path).await
    }

    async fn list(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        self.as_ref().list(path).await
    }

    async fn write(&self, path: &str, fields: Fields) -> Result<Option<Reply>, BackendError> {
        self.as_ref().write(path, fields).await
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.as_ref().delete(path).await
    }
}

#[async_trait]
impl<T> PolicyBackend for Arc<T>
where
    T: PolicyBackend + ?Sized,
{
    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), BackendError> {
        self.as_ref().put_policy(name, rules).await
    }

    async fn delete_policy(&self, name: &str) -> Result<(), BackendError> {
        self.as_ref().delete_policy(name).await
    }
}

/// Decode backend `fields` read from `path` into `T`.
///
/// Missing or mistyped fields are a [BackendError::MalformedResponse]; they
/// are never defaulted.
pub fn decode<T>(path: &str, fields: Fields) -> Result<T, BackendError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|error| BackendError::malformed(path, error.to_string()))
}
