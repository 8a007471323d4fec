use async_trait::async_trait;

use crate::{Authorization, Backend, CredentialProvider, Settings};

/// Builds a backend client scoped to one caller.
///
/// The calling service layer invokes this once per request with the
/// caller's [Authorization] and the request headers it wants forwarded, so
/// no client is ever shared between identities.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// The scoped client this factory produces
    type Client: Backend;
    /// The error produced when a client cannot be built
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a client acting as `authorization`.
    async fn scoped(
        &self,
        authorization: &Authorization,
        headers: &[(String, String)],
    ) -> Result<Self::Client, Self::Error>;
}

/// Build a [CredentialProvider] for one request.
pub async fn connect<Factory>(
    factory: &Factory,
    authorization: Authorization,
    headers: &[(String, String)],
    settings: Settings,
) -> Result<CredentialProvider<Factory::Client>, Factory::Error>
where
    Factory: ClientFactory,
{
    let client = factory.scoped(&authorization, headers).await?;
    Ok(CredentialProvider::new(authorization, client, settings))
}
