use serde::{Deserialize, Serialize};

/// Scope used for every Microsoft Graph call this crate makes.
pub const GRAPH_SCOPES: &[&str] = &["Files.Read.All"];

/// A signed-in identity as reported by the identity client.
///
/// We never look inside it; it is only handed back to the client for silent
/// token requests and logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub home_account_id: String,
    pub username: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

/// Which API the token is for. Each resource has its own scope set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Graph,
    SharePoint,
}

/// Configuration handed to the identity client factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClientConfig {
    pub client_id: String,
    pub authority: String,
    pub redirect_uri: String,
    pub cache_location: String,
    pub store_auth_state_in_cookie: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentTokenRequest {
    pub scopes: Vec<String>,
    pub account: Account,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectLoginRequest {
    pub scopes: Vec<String>,
    /// Page to come back to once the identity provider redirects.
    pub redirect_start_page: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub access_token: String,
}
