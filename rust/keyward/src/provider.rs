use serde::Deserialize;
use serde_json::json;

use crate::naming::{validate_project, validate_target};
use crate::{
    Authorization, Backend, BackendError, CredentialError, Fields, Naming, Operation, Project,
    ProjectToken, Resource, Settings, Target, Token, decode, policy,
};


#[derive(Deserialize)]
struct RoleId {
    role_id: String,
}

#[derive(Deserialize)]
struct IssuedSecret {
    secret_id: String,
    secret_id_accessor: String,
}

#[derive(Deserialize)]
struct SecretMetadata {
    creation_time: String,
    expiration_time: String,
}

#[derive(Deserialize)]
struct KeyList {
    keys: Vec<String>,
}

/// The operation and resource a backend call is made for.
struct Context {
    operation: Operation,
    resource: Resource,
}

impl Context {
    fn new(operation: Operation, resource: Resource) -> Self {
        Self {
            operation,
            resource,
        }
    }

    fn fail(&self, source: BackendError) -> CredentialError {
        tracing::warn!(
            operation = %self.operation,
            resource = %self.resource,
            error = %source,
            "Backend call failed"
        );
        CredentialError::Backend {
            operation: self.operation,
            resource: self.resource.clone(),
            source,
        }
    }

    fn not_found(&self) -> CredentialError {
        tracing::debug!(
            operation = %self.operation,
            resource = %self.resource,
            "Resource not found"
        );
        CredentialError::NotFound(self.resource.clone())
    }
}

/// Maps the project/target credential lifecycle onto a secret backend.
///
/// A provider is built per request for one caller (see
/// [crate::ClientFactory]) and holds no state across calls. Every operation
/// except [CredentialProvider::project_exists] and
/// [CredentialProvider::target_exists] is admin-only, and refuses other
/// callers before the backend is contacted.
pub struct CredentialProvider<B> {
    authorization: Authorization,
    backend: B,
    settings: Settings,
}

impl<B> CredentialProvider<B>
where
    B: Backend,
{
    /// A provider acting as `authorization` through `backend`.
    pub fn new(authorization: Authorization, backend: B, settings: Settings) -> Self {
        Self {
            authorization,
            backend,
            settings,
        }
    }

    /// The caller this provider acts for
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// The backend this provider talks to
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The path naming in use
    pub fn naming(&self) -> &Naming {
        &self.settings.naming
    }

    /// Create `project`, or re-create it with a freshly issued secret.
    ///
    /// Writes the project policy and AppRole role, then issues a secret for
    /// the role. The returned [Token] holds exactly what the backend
    /// reported.
    pub async fn create_project(&self, project: &str) -> Result<Token, CredentialError> {
        let context = Context::new(Operation::CreateProject, Resource::project(project));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        let naming = self.naming();

        self.backend
            .put_policy(
                &naming.project_name(project),
                &policy::project_policy(naming, project),
            )
            .await
            .map_err(|error| context.fail(error))?;

        self.backend
            .write(
                &naming.project_role_path(project),
                policy::role_options(naming, &self.settings.role, project),
            )
            .await
            .map_err(|error| context.fail(error))?;

        let role_id_path = naming.role_id_path(project);
        let fields = self
            .backend
            .read(&role_id_path)
            .await
            .map_err(|error| context.fail(error))?
            .ok_or_else(|| {
                context.fail(BackendError::malformed(
                    &role_id_path,
                    "no role id reported for the role just written",
                ))
            })?;
        let RoleId { role_id } =
            decode(&role_id_path, fields).map_err(|error| context.fail(error))?;

        let secret_id_path = naming.secret_id_path(project);
        let reply = self
            .backend
            .write(&secret_id_path, Fields::new())
            .await
            .map_err(|error| context.fail(error))?
            .ok_or_else(|| {
                context.fail(BackendError::malformed(
                    &secret_id_path,
                    "no secret id reported",
                ))
            })?;
        let IssuedSecret {
            secret_id,
            secret_id_accessor,
        } = decode(&secret_id_path, reply.data).map_err(|error| context.fail(error))?;

        let metadata = self
            .lookup_secret(project, &secret_id_accessor)
            .await
            .map_err(|error| context.fail(error))?
            .ok_or_else(|| {
                context.fail(BackendError::malformed(
                    naming.secret_accessor_lookup_path(project),
                    "the secret just issued could not be looked up",
                ))
            })?;

        tracing::debug!(%project, "Created project");

        Ok(Token {
            project: project.to_string(),
            role_id,
            secret: secret_id,
            secret_accessor: secret_id_accessor,
            created_at: metadata.creation_time,
            expires_at: metadata.expiration_time,
        })
    }

    /// Delete `project`'s policy and role.
    ///
    /// Targets of the project are left in place.
    pub async fn delete_project(&self, project: &str) -> Result<(), CredentialError> {
        let context = Context::new(Operation::DeleteProject, Resource::project(project));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        let naming = self.naming();

        self.backend
            .delete_policy(&naming.project_name(project))
            .await
            .map_err(|error| context.fail(error))?;
        self.backend
            .delete(&naming.project_role_path(project))
            .await
            .map_err(|error| context.fail(error))?;

        tracing::debug!(%project, "Deleted project");
        Ok(())
    }

    /// Read `project`.
    pub async fn get_project(&self, project: &str) -> Result<Project, CredentialError> {
        let context = Context::new(Operation::GetProject, Resource::project(project));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        match self.read_role(&context, project).await? {
            Some(_) => Ok(Project {
                name: project.to_string(),
            }),
            None => Err(context.not_found()),
        }
    }

    /// Whether `project` exists. Permitted to any caller.
    pub async fn project_exists(&self, project: &str) -> Result<bool, CredentialError> {
        let context = Context::new(Operation::ProjectExists, Resource::project(project));
        validate_project(project)?;

        Ok(self.read_role(&context, project).await?.is_some())
    }

    /// Create `target` in `project`, overwriting any target of that name.
    ///
    /// The project is not checked first; the backend decides whether the
    /// write is acceptable.
    pub async fn create_target(
        &self,
        project: &str,
        target: &Target,
    ) -> Result<(), CredentialError> {
        let context = Context::new(
            Operation::CreateTarget,
            Resource::target(project, &target.name),
        );
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;
        validate_target(&target.name)?;

        self.write_target(&context, project, target).await?;

        tracing::debug!(%project, target = %target.name, "Created target");
        Ok(())
    }

    /// Replace an existing target in `project` with `target`.
    pub async fn update_target(
        &self,
        project: &str,
        target: &Target,
    ) -> Result<(), CredentialError> {
        let context = Context::new(
            Operation::UpdateTarget,
            Resource::target(project, &target.name),
        );
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;
        validate_target(&target.name)?;

        if self.read_target(&context, project, &target.name).await?.is_none() {
            return Err(context.not_found());
        }

        self.write_target(&context, project, target).await?;

        tracing::debug!(%project, target = %target.name, "Updated target");
        Ok(())
    }

    /// Delete `target` from `project`.
    pub async fn delete_target(
        &self,
        project: &str,
        target: &str,
    ) -> Result<(), CredentialError> {
        let context = Context::new(Operation::DeleteTarget, Resource::target(project, target));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;
        validate_target(target)?;

        self.backend
            .delete(&self.naming().target_path(project, target))
            .await
            .map_err(|error| context.fail(error))?;

        tracing::debug!(%project, %target, "Deleted target");
        Ok(())
    }

    /// Read `target` of `project`.
    pub async fn get_target(
        &self,
        project: &str,
        target: &str,
    ) -> Result<Target, CredentialError> {
        let context = Context::new(Operation::GetTarget, Resource::target(project, target));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;
        validate_target(target)?;

        let path = self.naming().target_path(project, target);
        let fields = self
            .read_target(&context, project, target)
            .await?
            .ok_or_else(|| context.not_found())?;
        let properties =
            policy::decode_target(&path, fields).map_err(|error| context.fail(error))?;

        Ok(Target::new(target, properties))
    }

    /// Whether `target` exists in `project`. Permitted to any caller.
    pub async fn target_exists(
        &self,
        project: &str,
        target: &str,
    ) -> Result<bool, CredentialError> {
        let context = Context::new(Operation::TargetExists, Resource::target(project, target));
        validate_project(project)?;
        validate_target(target)?;

        Ok(self.read_target(&context, project, target).await?.is_some())
    }

    /// The names of `project`'s targets, in the backend's listing order.
    ///
    /// The listing covers every project's targets; keys that do not carry
    /// this project's prefix are skipped. A listing whose keys are not all
    /// strings is rejected as a whole.
    pub async fn list_targets(&self, project: &str) -> Result<Vec<String>, CredentialError> {
        let context = Context::new(Operation::ListTargets, Resource::targets(project));
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        let naming = self.naming();
        let path = naming.targets_path();

        let Some(fields) = self
            .backend
            .list(&path)
            .await
            .map_err(|error| context.fail(error))?
        else {
            return Ok(Vec::new());
        };
        let KeyList { keys } = decode(&path, fields).map_err(|error| context.fail(error))?;

        Ok(keys
            .iter()
            .filter_map(|key| naming.target_from_key(project, key))
            .map(str::to_string)
            .collect())
    }

    /// Look up a secret issued for `project` by its accessor.
    pub async fn get_project_token(
        &self,
        project: &str,
        token_id: &str,
    ) -> Result<ProjectToken, CredentialError> {
        let context = Context::new(
            Operation::GetProjectToken,
            Resource::project_token(project, token_id),
        );
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        let metadata = self
            .lookup_secret(project, token_id)
            .await
            .map_err(|error| context.fail(error))?
            .ok_or_else(|| context.not_found())?;

        Ok(ProjectToken {
            id: token_id.to_string(),
            created_at: metadata.creation_time,
            expires_at: metadata.expiration_time,
        })
    }

    /// Revoke a secret issued for `project` by its accessor.
    ///
    /// An accessor the backend does not know is reported as
    /// [CredentialError::NotFound].
    pub async fn delete_project_token(
        &self,
        project: &str,
        token_id: &str,
    ) -> Result<(), CredentialError> {
        let context = Context::new(
            Operation::DeleteProjectToken,
            Resource::project_token(project, token_id),
        );
        self.authorization.authorize(context.operation)?;
        validate_project(project)?;

        let destroyed = self
            .backend
            .write(
                &self.naming().secret_accessor_destroy_path(project),
                accessor_fields(token_id),
            )
            .await;

        match destroyed {
            Ok(_) => {}
            Err(BackendError::NotFound { .. }) => return Err(context.not_found()),
            Err(error) => return Err(context.fail(error)),
        }

        tracing::debug!(%project, "Deleted project token");
        Ok(())
    }

    async fn read_role(
        &self,
        context: &Context,
        project: &str,
    ) -> Result<Option<Fields>, CredentialError> {
        self.backend
            .read(&self.naming().project_role_path(project))
            .await
            .map_err(|error| context.fail(error))
    }

    async fn read_target(
        &self,
        context: &Context,
        project: &str,
        target: &str,
    ) -> Result<Option<Fields>, CredentialError> {
        self.backend
            .read(&self.naming().target_path(project, target))
            .await
            .map_err(|error| context.fail(error))
    }

    async fn write_target(
        &self,
        context: &Context,
        project: &str,
        target: &Target,
    ) -> Result<(), CredentialError> {
        self.backend
            .write(
                &self.naming().target_path(project, &target.name),
                policy::target_fields(&target.properties),
            )
            .await
            .map_err(|error| context.fail(error))?;
        Ok(())
    }

    async fn lookup_secret(
        &self,
        project: &str,
        accessor: &str,
    ) -> Result<Option<SecretMetadata>, BackendError> {
        let path = self.naming().secret_accessor_lookup_path(project);
        match self.backend.write(&path, accessor_fields(accessor)).await {
            Ok(Some(reply)) => decode(&path, reply.data).map(Some),
            Ok(None) | Err(BackendError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn accessor_fields(accessor: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("secret_id_accessor".into(), json!(accessor));
    fields
}
