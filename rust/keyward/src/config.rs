use serde::{Deserialize, Serialize};

use crate::Naming;

/// Settings applied to the AppRole role created for each project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSettings {
    /// How long an issued secret id stays valid
    pub secret_id_ttl: String,
    /// Default lifetime of tokens obtained by logging in
    pub token_ttl: String,
    /// Maximum lifetime of tokens obtained by logging in
    pub token_max_ttl: String,
    /// Kind of token issued on login
    pub token_type: String,
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self {
            secret_id_ttl: "8776h".to_string(),
            token_ttl: "10m".to_string(),
            token_max_ttl: "10m".to_string(),
            token_type: "service".to_string(),
        }
    }
}

/// Everything a [crate::CredentialProvider] is configured with.
///
/// Every field has a default, so a host service may deserialize this from a
/// partial document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path naming
    pub naming: Naming,
    /// Project role settings
    pub role: RoleSettings,
}
