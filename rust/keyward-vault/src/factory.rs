use async_trait::async_trait;
use keyward::{Authorization, ClientFactory, Naming};

use crate::{VaultBackend, VaultBackendError, VaultConfig};

/// Builds a [VaultBackend] for each caller.
///
/// The admin caller's token is presented as is. A scoped caller is logged in
/// through AppRole with its role id and secret id, and the issued client
/// token is presented instead.
#[derive(Clone, Debug)]
pub struct VaultClientFactory {
    config: VaultConfig,
    naming: Naming,
}

impl VaultClientFactory {
    /// A factory for the server in `config`, logging scoped callers in at the
    /// AppRole mount named by `naming`.
    pub fn new(config: VaultConfig, naming: Naming) -> Self {
        Self { config, naming }
    }

    /// The server configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }
}

#[async_trait]
impl ClientFactory for VaultClientFactory {
    type Client = VaultBackend;
    type Error = VaultBackendError;

    async fn scoped(
        &self,
        authorization: &Authorization,
        headers: &[(String, String)],
    ) -> Result<Self::Client, Self::Error> {
        let client = VaultBackend::new(&self.config)?.with_headers(self.config.forwarded(headers));

        match authorization {
            Authorization::Admin { token } => Ok(client.with_token(token.as_str())),
            Authorization::Scoped { role_id, secret } => {
                let token = client
                    .login(&self.naming.login_path(), role_id, secret)
                    .await
                    .inspect_err(|error| {
                        tracing::debug!(%role_id, %error, "AppRole login failed");
                    })?;
                Ok(client.with_token(token))
            }
        }
    }
}
