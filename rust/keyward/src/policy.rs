//! Construction of the documents written to the backend.
//!
//! A project gets a policy allowing it to read credentials of its own
//! targets, and an AppRole role bound to that policy. A target is a role in
//! the secrets engine whose record is rebuilt in full on every write.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{BackendError, Fields, Naming, RoleSettings, TargetProperties, decode};

/// The target record as the secrets engine stores it.
#[derive(Serialize, Deserialize)]
struct TargetRecord {
    credential_type: String,
    #[serde(rename = "policy_arns")]
    policy_refs: Vec<String>,
    policy_document: String,
    #[serde(rename = "role_arns")]
    role_refs: Vec<String>,
}

/// The policy rules granting `project` read access to its targets'
/// credentials.
pub fn project_policy(naming: &Naming, project: &str) -> String {
    format!(
        "path \"{}*\" {{\n  capabilities = [\"read\"]\n}}\n",
        naming.credentials_path(project)
    )
}

/// The options of the AppRole role owned by `project`.
pub fn role_options(naming: &Naming, role: &RoleSettings, project: &str) -> Fields {
    let options = json!({
        "secret_id_ttl": role.secret_id_ttl,
        "token_ttl": role.token_ttl,
        "token_max_ttl": role.token_max_ttl,
        "token_policies": ["default", naming.project_name(project)],
        "token_no_default_policy": true,
        "token_type": role.token_type,
    });

    match options {
        serde_json::Value::Object(fields) => fields,
        _ => unreachable!("role options are a JSON object"),
    }
}

/// The record written for a target with `properties`.
pub fn target_fields(properties: &TargetProperties) -> Fields {
    let record = TargetRecord {
        credential_type: properties.credential_type.clone(),
        policy_refs: properties.policy_refs.clone(),
        policy_document: properties.policy_document.clone(),
        role_refs: properties.role_refs.clone(),
    };

    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(fields)) => fields,
        _ => unreachable!("target records serialize to a JSON object"),
    }
}

/// Decode a target record read from `path`.
pub fn decode_target(path: &str, fields: Fields) -> Result<TargetProperties, BackendError> {
    let record: TargetRecord = decode(path, fields)?;

    Ok(TargetProperties {
        role_refs: record.role_refs,
        policy_refs: record.policy_refs,
        policy_document: record.policy_document,
        credential_type: record.credential_type,
    })
}
