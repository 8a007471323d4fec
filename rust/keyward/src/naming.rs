//! Translation between project/target names and backend paths.
//!
//! Every backend resource owned by a project is named
//! `<tag>-projects-<project>`, and every target resource
//! `<tag>-projects-<project>-target-<target>`. Targets of all projects share
//! one listing under the secrets mount, so target names are recovered from
//! listed keys by stripping the project's prefix.

use serde::{Deserialize, Serialize};

use crate::{CredentialError, NameKind};

/// Default namespace tag for every resource this crate names.
pub const DEFAULT_TAG: &str = "pipelines";

/// Default mount of the AppRole authentication engine.
pub const DEFAULT_APPROLE_MOUNT: &str = "auth/approle";

/// Default mount of the secrets engine that holds target roles.
pub const DEFAULT_SECRETS_MOUNT: &str = "aws";

const MAX_NAME_LENGTH: usize = 32;

/// Path naming for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    /// Namespace tag prefixed to every resource name
    pub tag: String,
    /// Mount of the AppRole authentication engine
    pub approle_mount: String,
    /// Mount of the secrets engine holding target roles
    pub secrets_mount: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            approle_mount: DEFAULT_APPROLE_MOUNT.to_string(),
            secrets_mount: DEFAULT_SECRETS_MOUNT.to_string(),
        }
    }
}

impl Naming {
    /// Naming with a custom tag and the default mounts.
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// The role and policy name owned by `project`.
    pub fn project_name(&self, project: &str) -> String {
        format!("{}-projects-{project}", self.tag)
    }

    /// Path of the AppRole role owned by `project`.
    pub fn project_role_path(&self, project: &str) -> String {
        format!("{}/role/{}", self.approle_mount, self.project_name(project))
    }

    /// Path that reports the role id of `project`'s role.
    pub fn role_id_path(&self, project: &str) -> String {
        format!("{}/role-id", self.project_role_path(project))
    }

    /// Path that issues secret ids for `project`'s role.
    pub fn secret_id_path(&self, project: &str) -> String {
        format!("{}/secret-id", self.project_role_path(project))
    }

    /// Path that looks up an issued secret by its accessor.
    pub fn secret_accessor_lookup_path(&self, project: &str) -> String {
        format!(
            "{}/secret-id-accessor/lookup",
            self.project_role_path(project)
        )
    }

    /// Path that revokes an issued secret by its accessor.
    pub fn secret_accessor_destroy_path(&self, project: &str) -> String {
        format!(
            "{}/secret-id-accessor/destroy",
            self.project_role_path(project)
        )
    }

    /// Path of the AppRole login endpoint.
    pub fn login_path(&self) -> String {
        format!("{}/login", self.approle_mount)
    }

    /// The prefix every target key of `project` carries.
    pub fn target_prefix(&self, project: &str) -> String {
        format!("{}-target-", self.project_name(project))
    }

    /// The backend resource name of a target.
    pub fn target_name(&self, project: &str, target: &str) -> String {
        format!("{}{target}", self.target_prefix(project))
    }

    /// Path of a target's role in the secrets engine.
    pub fn target_path(&self, project: &str, target: &str) -> String {
        format!("{}/{}", self.targets_path(), self.target_name(project, target))
    }

    /// Path listing the targets of every project.
    pub fn targets_path(&self) -> String {
        format!("{}/roles", self.secrets_mount)
    }

    /// Path credentials for `project`'s targets are issued from.
    pub fn credentials_path(&self, project: &str) -> String {
        format!("{}/sts/{}", self.secrets_mount, self.target_prefix(project))
    }

    /// Recover the target name from a listed key.
    ///
    /// Returns `None` for keys that belong to another project (or to nothing
    /// this crate created) and for keys with an empty target name.
    pub fn target_from_key<'a>(&self, project: &str, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.target_prefix(project).as_str())
            .filter(|target| !target.is_empty())
    }
}

/// Check that `project` is a valid project name.
///
/// Project names are ASCII alphanumeric, which keeps one project's target
/// prefix from ever being a prefix of another project's keys.
pub fn validate_project(project: &str) -> Result<(), CredentialError> {
    validate(NameKind::Project, project, |c| c.is_ascii_alphanumeric())
}

/// Check that `target` is a valid target name.
pub fn validate_target(target: &str) -> Result<(), CredentialError> {
    validate(NameKind::Target, target, |c| {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    })
}

fn validate(
    kind: NameKind,
    name: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<(), CredentialError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_NAME_LENGTH {
        Some("must be at most 32 characters long")
    } else if !name.chars().all(allowed) {
        Some(match kind {
            NameKind::Project => "must only contain ASCII letters and digits",
            NameKind::Target => "must only contain ASCII letters, digits, '-' and '_'",
        })
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CredentialError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
