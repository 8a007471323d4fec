use serde::{Deserialize, Serialize};
use url::Url;

use crate::VaultBackendError;

/// Environment variable holding the Vault address
pub const ADDRESS_VARIABLE: &str = "KEYWARD_VAULT_ADDR";
/// Environment variable holding the Vault namespace
pub const NAMESPACE_VARIABLE: &str = "KEYWARD_VAULT_NAMESPACE";
/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_VARIABLE: &str = "KEYWARD_VAULT_TIMEOUT_SECONDS";
/// Environment variable holding a comma separated list of forwarded headers
pub const FORWARD_HEADERS_VARIABLE: &str = "KEYWARD_VAULT_FORWARD_HEADERS";

/// Configuration for reaching a Vault server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Base address of the server (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Optional Vault Enterprise namespace
    pub namespace: Option<String>,

    /// Optional timeout for requests in seconds (default: 30)
    pub timeout_seconds: Option<u64>,

    /// Names of inbound request headers passed through to Vault
    pub forward_headers: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            namespace: None,
            timeout_seconds: Some(30),
            forward_headers: Vec::new(),
        }
    }
}

impl VaultConfig {
    /// Create a configuration for the server at `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Set the namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Forward the inbound header `name` to Vault
    pub fn with_forwarded_header(mut self, name: impl Into<String>) -> Self {
        self.forward_headers.push(name.into());
        self
    }

    /// Read the configuration from the process environment, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, VaultBackendError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<Lookup>(lookup: Lookup) -> Result<Self, VaultBackendError>
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup(ADDRESS_VARIABLE) {
            config.address = address;
        }
        config.namespace = lookup(NAMESPACE_VARIABLE).filter(|namespace| !namespace.is_empty());

        if let Some(timeout) = lookup(TIMEOUT_VARIABLE) {
            let seconds = timeout
                .trim()
                .parse::<u64>()
                .map_err(|error| VaultBackendError::InvalidSetting {
                    name: TIMEOUT_VARIABLE.to_string(),
                    reason: error.to_string(),
                })?;
            config.timeout_seconds = Some(seconds);
        }

        if let Some(headers) = lookup(FORWARD_HEADERS_VARIABLE) {
            config.forward_headers = headers
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.base_url()?;
        Ok(config)
    }

    /// The validated base URL of the server, always ending in `/`.
    pub fn base_url(&self) -> Result<Url, VaultBackendError> {
        let invalid = |reason: &str| VaultBackendError::InvalidAddress {
            address: self.address.clone(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(&self.address).map_err(|error| invalid(&error.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("no host"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Select the headers from `headers` that this configuration forwards.
    /// Names are matched case-insensitively.
    pub fn forwarded(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| {
                self.forward_headers
                    .iter()
                    .any(|forwarded| forwarded.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect()
    }
}
