use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::BackendError;

use super::{Fields, LogicalBackend, PolicyBackend, Reply};

/// A trivial implementation of [LogicalBackend] and [PolicyBackend] - backed
/// by ordered maps - where everything is kept in memory and never persisted.
///
/// Writes store the fields verbatim and reply with no body; it does not
/// emulate engines that generate data on write.
#[derive(Clone, Default, Debug)]
pub struct MemoryBackend {
    entries: Arc<RwLock<BTreeMap<String, Fields>>>,
    policies: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    /// The rules of the policy `name`, if it exists.
    pub async fn policy(&self, name: &str) -> Option<String> {
        self.policies.read().await.get(name).cloned()
    }

    /// All paths currently holding fields.
    pub async fn paths(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

#[async_trait]
impl LogicalBackend for MemoryBackend {
    async fn read(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        let entries = self.entries.read().await;
        Ok(entries.get(normalize(path)).cloned())
    }

    async fn list(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        let prefix = format!("{}/", normalize(path));
        let entries = self.entries.read().await;

        let keys: BTreeSet<String> = entries
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .map(|rest| match rest.split_once('/') {
                Some((folder, _)) => format!("{folder}/"),
                None => rest.to_string(),
            })
            .collect();

        if keys.is_empty() {
            return Ok(None);
        }

        let mut fields = Fields::new();
        fields.insert("keys".into(), keys.into_iter().collect());
        Ok(Some(fields))
    }

    async fn write(&self, path: &str, fields: Fields) -> Result<Option<Reply>, BackendError> {
        let mut entries = self.entries.write().await;
        entries.insert(normalize(path).to_string(), fields);
        Ok(None)
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.write().await;
        entries.remove(normalize(path));
        Ok(())
    }
}

#[async_trait]
impl PolicyBackend for MemoryBackend {
    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), BackendError> {
        let mut policies = self.policies.write().await;
        policies.insert(name.to_string(), rules.to_string());
        Ok(())
    }

    async fn delete_policy(&self, name: &str) -> Result<(), BackendError> {
        let mut policies = self.policies.write().await;
        policies.remove(name);
        Ok(())
    }
}
