use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};

/// A project as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Project name
    pub name: String,
}

/// The credential configuration of a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProperties {
    /// External roles the issued credentials assume
    pub role_refs: Vec<String>,
    /// Managed policies attached to the issued credentials
    pub policy_refs: Vec<String>,
    /// Backend-native policy document further scoping the credentials
    pub policy_document: String,
    /// The kind of credentials issued for this target
    pub credential_type: String,
}

/// A named, project-scoped credential configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Target name, unique within its project
    pub name: String,
    /// Credential configuration
    pub properties: TargetProperties,
}

impl Target {
    /// A target with the given name and properties.
    pub fn new(name: impl Into<String>, properties: TargetProperties) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }
}

/// The credentials issued when a project is created.
///
/// Every field holds exactly what the backend reported. The provider keeps
/// no copy once it is returned.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The project the token was issued for
    pub project: String,
    /// The AppRole role id
    pub role_id: String,
    /// The AppRole secret id
    pub secret: String,
    /// Handle that revokes the secret without revealing it
    pub secret_accessor: String,
    /// Creation timestamp as reported by the backend
    pub created_at: String,
    /// Expiration timestamp as reported by the backend
    pub expires_at: String,
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("project", &self.project)
            .field("role_id", &self.role_id)
            .field("secret", &"<redacted>")
            .field("secret_accessor", &self.secret_accessor)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Metadata of a secret issued for a project, looked up by its accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectToken {
    /// The secret accessor identifying the token
    pub id: String,
    /// Creation timestamp as reported by the backend
    pub created_at: String,
    /// Expiration timestamp as reported by the backend
    pub expires_at: String,
}
