use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Failures reported by a secret backend.
///
/// Reads and lists report absence as `Ok(None)`. A write addressing
/// something that does not exist (such as an unknown secret accessor) fails
/// with [BackendError::NotFound].
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend could not be reached or the transport failed
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A write addressed something the backend does not have
    #[error("Nothing exists at '{path}'")]
    NotFound {
        /// Path the request addressed
        path: String,
    },

    /// The backend refused the presented credentials for this path
    #[error("Backend denied access to '{path}'")]
    PermissionDenied {
        /// Path the request addressed
        path: String,
    },

    /// The backend answered with a non-success status
    #[error("Backend rejected request to '{path}' with status {status}: {}", .errors.join("; "))]
    Rejected {
        /// Path the request addressed
        path: String,
        /// Status reported by the backend
        status: u16,
        /// Error messages carried in the response body
        errors: Vec<String>,
    },

    /// The response was missing expected fields or had an unexpected shape
    #[error("Malformed backend response from '{path}': {reason}")]
    MalformedResponse {
        /// Path the request addressed
        path: String,
        /// What was wrong with the response
        reason: String,
    },

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Shorthand for [BackendError::MalformedResponse].
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BackendError::MalformedResponse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// The provider operations, used to give errors and log events context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create (or re-create) a project
    CreateProject,
    /// Delete a project
    DeleteProject,
    /// Read a project
    GetProject,
    /// Check whether a project exists
    ProjectExists,
    /// Create (or overwrite) a target
    CreateTarget,
    /// Replace an existing target
    UpdateTarget,
    /// Delete a target
    DeleteTarget,
    /// Read a target
    GetTarget,
    /// Check whether a target exists
    TargetExists,
    /// Enumerate the targets of a project
    ListTargets,
    /// Look up an issued project token
    GetProjectToken,
    /// Revoke an issued project token
    DeleteProjectToken,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            Operation::CreateProject => "create project",
            Operation::DeleteProject => "delete project",
            Operation::GetProject => "get project",
            Operation::ProjectExists => "check project",
            Operation::CreateTarget => "create target",
            Operation::UpdateTarget => "update target",
            Operation::DeleteTarget => "delete target",
            Operation::GetTarget => "get target",
            Operation::TargetExists => "check target",
            Operation::ListTargets => "list targets",
            Operation::GetProjectToken => "get project token",
            Operation::DeleteProjectToken => "delete project token",
        };
        f.write_str(description)
    }
}

/// The resource an operation addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// A project
    Project {
        /// Project name
        project: String,
    },
    /// A target within a project
    Target {
        /// Project name
        project: String,
        /// Target name
        target: String,
    },
    /// All targets of a project
    Targets {
        /// Project name
        project: String,
    },
    /// A token issued for a project
    ProjectToken {
        /// Project name
        project: String,
        /// Token identifier (the secret accessor)
        token: String,
    },
}

impl Resource {
    /// A project resource.
    pub fn project(project: &str) -> Self {
        Resource::Project {
            project: project.to_string(),
        }
    }

    /// A target resource.
    pub fn target(project: &str, target: &str) -> Self {
        Resource::Target {
            project: project.to_string(),
            target: target.to_string(),
        }
    }

    /// The target collection of a project.
    pub fn targets(project: &str) -> Self {
        Resource::Targets {
            project: project.to_string(),
        }
    }

    /// A project token resource.
    pub fn project_token(project: &str, token: &str) -> Self {
        Resource::ProjectToken {
            project: project.to_string(),
            token: token.to_string(),
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Project { project } => write!(f, "project '{project}'"),
            Resource::Target { project, target } => {
                write!(f, "target '{target}' of project '{project}'")
            }
            Resource::Targets { project } => write!(f, "targets of project '{project}'"),
            Resource::ProjectToken { project, token } => {
                write!(f, "token '{token}' of project '{project}'")
            }
        }
    }
}

/// Which kind of name failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// A project name
    Project,
    /// A target name
    Target,
}

impl Display for NameKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Project => f.write_str("project"),
            NameKind::Target => f.write_str("target"),
        }
    }
}

/// The error type returned by every [crate::CredentialProvider] operation.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The caller is not the admin; raised before any backend contact
    #[error("Admin credentials are required to {0}")]
    Unauthorized(Operation),

    /// The backend reported that the addressed resource does not exist
    #[error("{0} not found")]
    NotFound(Resource),

    /// A project or target name was rejected before any backend contact
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// Kind of name
        kind: NameKind,
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Any other backend failure, with the context it happened in
    #[error("Failed to {operation} ({resource}): {source}")]
    Backend {
        /// The operation that failed
        operation: Operation,
        /// The resource it addressed
        resource: Resource,
        /// The underlying backend failure
        #[source]
        source: BackendError,
    },
}

impl CredentialError {
    /// Whether the caller was refused by the admin gate.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CredentialError::Unauthorized(_))
    }

    /// Whether the addressed resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CredentialError::NotFound(_))
    }

    /// Whether the backend answered with a response of unexpected shape.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            CredentialError::Backend {
                source: BackendError::MalformedResponse { .. },
                ..
            }
        )
    }
}
