// Token broker - "get me a token for this resource" as a single operation.
//
// This service handles:
// - Lazy, shared initialization of the identity client
// - Scope selection per resource (Graph vs SharePoint)
// - Silent acquisition with fallback to an interactive redirect
// - Sign-out
//
// NO browser dependencies here - the identity client and the page are injected.

use super::auth_models::{
    Account, IdentityClientConfig, RedirectLoginRequest, Resource, SilentTokenRequest,
    GRAPH_SCOPES,
};
use super::identity_client::{IdentityClient, IdentityClientFactory, IdentityError, PageSession};
use crate::core::settings::{ConfigError, SiteSettings};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Session storage key holding the page to return to after login.
pub const REDIRECT_STORAGE_KEY: &str = "csod.msal.redirect";

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Owns the identity client for the lifetime of the host application.
///
/// The client slot is a `OnceCell`: the first caller builds and initializes the
/// client, every concurrent caller awaits that same initialization instead of
/// racing its own. A failed initialization leaves the slot empty.
pub struct TokenBroker {
    settings: SiteSettings,
    factory: Arc<dyn IdentityClientFactory>,
    page: Arc<dyn PageSession>,
    client: OnceCell<Arc<dyn IdentityClient>>,
}

impl TokenBroker {
    pub fn new(
        settings: SiteSettings,
        factory: Arc<dyn IdentityClientFactory>,
        page: Arc<dyn PageSession>,
    ) -> Self {
        Self {
            settings,
            factory,
            page,
            client: OnceCell::new(),
        }
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Returns the shared identity client, creating it on first use.
    ///
    /// `Ok(None)` means the integration is not configured (no client id) and the
    /// caller should not prompt a login.
    async fn client(&self) -> Result<Option<Arc<dyn IdentityClient>>, AuthError> {
        if let Some(client) = self.client.get() {
            return Ok(Some(Arc::clone(client)));
        }

        let Some(client_id) = self.settings.client_id.as_deref() else {
            return Ok(None);
        };

        // Multi-tenant apps break audience validation, so refuse them up front.
        let tenant_id = self.settings.tenant_id()?;

        let config = IdentityClientConfig {
            client_id: client_id.to_string(),
            authority: format!("{AUTHORITY_HOST}/{tenant_id}"),
            redirect_uri: self.settings.redirect_uri()?,
            cache_location: "sessionStorage".to_string(),
            store_auth_state_in_cookie: true,
        };

        let client = self
            .client
            .get_or_try_init(|| async move {
                tracing::debug!(authority = %config.authority, "Initializing identity client");
                let client = self.factory.create(config);
                client.initialize().await?;
                Ok::<_, AuthError>(client)
            })
            .await?;

        Ok(Some(Arc::clone(client)))
    }

    /// Scope set for a resource.
    pub fn scopes_for(&self, resource: Resource) -> Result<Vec<String>, ConfigError> {
        match resource {
            Resource::Graph => Ok(GRAPH_SCOPES.iter().map(|s| s.to_string()).collect()),
            Resource::SharePoint => {
                let base_url = self.settings.sharepoint_base_url()?;
                Ok(vec![format!("{base_url}/.default")])
            }
        }
    }

    /// Acquire an access token for `resource`.
    ///
    /// # Returns
    /// - `Ok(Some(token))` when a token was obtained silently
    /// - `Ok(None)` when the integration is unconfigured, when there is no account
    ///   and `interactive` is false, or after an interactive redirect was started
    ///   (the page is navigating away at that point)
    pub async fn acquire_access_token(
        &self,
        account: Option<&Account>,
        interactive: bool,
        resource: Resource,
    ) -> Result<Option<String>, AuthError> {
        let Some(client) = self.client().await? else {
            tracing::debug!("OneDrive client id not configured, no token");
            return Ok(None);
        };

        let scopes = self.scopes_for(resource)?;

        if let Some(account) = account {
            let request = SilentTokenRequest {
                scopes: scopes.clone(),
                account: account.clone(),
            };

            match client.acquire_token_silent(request).await {
                Ok(result) => return Ok(Some(result.access_token)),
                Err(IdentityError::InteractionRequired(reason)) if interactive => {
                    tracing::info!(%reason, ?resource, "Silent token acquisition needs interaction");
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !interactive {
            return Ok(None);
        }

        let current_page = self.page.current_url();
        self.page
            .remember_redirect_page(REDIRECT_STORAGE_KEY, &current_page);

        tracing::info!(?resource, "Redirecting to identity provider for login");
        client
            .login_redirect(RedirectLoginRequest {
                scopes,
                redirect_start_page: current_page,
            })
            .await?;

        Ok(None)
    }

    /// Redirect-based logout. No-op without a configured client or an account.
    pub async fn sign_out(&self, account: Option<&Account>) -> Result<(), AuthError> {
        let Some(client) = self.client().await? else {
            return Ok(());
        };
        let Some(account) = account else {
            return Ok(());
        };

        client.logout_redirect(account).await?;
        Ok(())
    }

    /// Accounts in the identity client's cache (empty when unconfigured).
    pub async fn accounts(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self
            .client()
            .await?
            .map(|client| client.get_all_accounts())
            .unwrap_or_default())
    }

    /// Finish any login redirect that brought us back to this page.
    pub async fn handle_redirect_result(&self) -> Result<(), AuthError> {
        if let Some(client) = self.client().await? {
            client.handle_redirect_promise().await?;
        }
        Ok(())
    }
}
