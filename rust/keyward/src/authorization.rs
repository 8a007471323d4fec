//! Caller identity and the admin gate.
//!
//! Callers present an authorization header of the form
//! `<provider>:<key>:<secret>`. The key `admin` selects the admin identity,
//! whose secret is a backend token; any other key is an AppRole role id whose
//! secret is the matching secret id.

use std::fmt::{Debug, Formatter};

use thiserror::Error;

use crate::{CredentialError, Operation};

/// The key that selects the admin identity in a presented header.
const ADMIN_KEY: &str = "admin";

/// Errors produced while parsing a presented authorization header.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthorizationHeaderError {
    /// The header did not have three `:`-separated parts
    #[error("Authorization header must have the form <provider>:<key>:<secret>")]
    Format,

    /// One of the parts was empty
    #[error("Authorization header has an empty {0}")]
    Empty(&'static str),
}

/// The identity a caller presents for a single call.
///
/// Constructed per call and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// The admin caller, authenticated by a backend token
    Admin {
        /// Backend token used for admin calls
        token: String,
    },
    /// A project-scoped caller, authenticated through AppRole login
    Scoped {
        /// The AppRole role id
        role_id: String,
        /// The AppRole secret id
        secret: String,
    },
}

impl Authorization {
    /// Parse a presented `<provider>:<key>:<secret>` header.
    ///
    /// The provider part names the credential backend and is only checked
    /// for presence. The secret may itself contain `:`.
    pub fn from_header(value: &str) -> Result<Self, AuthorizationHeaderError> {
        let mut parts = value.trim().splitn(3, ':');
        let (Some(provider), Some(key), Some(secret)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthorizationHeaderError::Format);
        };

        if provider.is_empty() {
            return Err(AuthorizationHeaderError::Empty("provider"));
        }
        if key.is_empty() {
            return Err(AuthorizationHeaderError::Empty("key"));
        }
        if secret.is_empty() {
            return Err(AuthorizationHeaderError::Empty("secret"));
        }

        Ok(if key == ADMIN_KEY {
            Authorization::Admin {
                token: secret.to_string(),
            }
        } else {
            Authorization::Scoped {
                role_id: key.to_string(),
                secret: secret.to_string(),
            }
        })
    }

    /// Whether this is the admin identity.
    pub fn is_admin(&self) -> bool {
        matches!(self, Authorization::Admin { .. })
    }

    /// Permit `operation` only for the admin identity.
    ///
    /// This is a pure check; callers run it before touching the backend.
    pub fn authorize(&self, operation: Operation) -> Result<(), CredentialError> {
        match self {
            Authorization::Admin { .. } => Ok(()),
            Authorization::Scoped { role_id, .. } => {
                tracing::debug!(%operation, %role_id, "Refusing non-admin caller");
                Err(CredentialError::Unauthorized(operation))
            }
        }
    }
}

impl Debug for Authorization {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorization::Admin { .. } => f
                .debug_struct("Admin")
                .field("token", &"<redacted>")
                .finish(),
            Authorization::Scoped { role_id, .. } => f
                .debug_struct("Scoped")
                .field("role_id", role_id)
                .field("secret", &"<redacted>")
                .finish(),
        }
    }
}
