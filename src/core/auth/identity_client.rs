// Ports for the third-party identity client and the page it runs in.
//
// The core defines WHAT it needs from the identity provider; the host supplies
// the actual client (MSAL in a browser, a fake in tests).

use super::auth_models::{
    Account, IdentityClientConfig, RedirectLoginRequest, SilentTokenRequest, TokenResult,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The cached credentials are not enough; the user has to log in again.
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    #[error("Identity client error: {0}")]
    Client(String),
}

/// The identity client surface we depend on.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// One-time initialization, run before the client is shared.
    async fn initialize(&self) -> Result<(), IdentityError>;

    /// Process a pending redirect response after page load.
    async fn handle_redirect_promise(&self) -> Result<(), IdentityError>;

    /// Accounts present in the client's cache.
    fn get_all_accounts(&self) -> Vec<Account>;

    async fn acquire_token_silent(
        &self,
        request: SilentTokenRequest,
    ) -> Result<TokenResult, IdentityError>;

    /// Starts a full-page redirect to the identity provider.
    /// In a browser this navigates away and never really comes back.
    async fn login_redirect(&self, request: RedirectLoginRequest) -> Result<(), IdentityError>;

    async fn logout_redirect(&self, account: &Account) -> Result<(), IdentityError>;
}

/// Builds identity clients. Called at most once per successful initialization.
pub trait IdentityClientFactory: Send + Sync {
    fn create(&self, config: IdentityClientConfig) -> Arc<dyn IdentityClient>;
}

/// The page hosting the integration.
pub trait PageSession: Send + Sync {
    fn current_url(&self) -> String;

    /// Remember where to return after an interactive login.
    fn remember_redirect_page(&self, key: &str, url: &str);
}
