// Site configuration for the OneDrive integration.
//
// The forum exposes its settings as a flat key-value map. We only read the
// handful of keys this crate cares about and normalise blank values to `None`
// so the rest of the code never has to think about empty strings.

use thiserror::Error;

pub const CLIENT_ID_KEY: &str = "cs_discourse_onedrive_client_id";
pub const TENANT_ID_KEY: &str = "cs_discourse_onedrive_tenant_id";
pub const SHAREPOINT_BASE_URL_KEY: &str = "cs_discourse_onedrive_sharepoint_base_url";
pub const SHAREPOINT_SITE_NAME_KEY: &str = "cs_discourse_onedrive_sharepoint_site_name";
pub const BASE_URL_KEY: &str = "discourse_base_url";

/// Path the identity provider redirects back to after an interactive login.
pub const REDIRECT_PATH: &str = "/cs-discourse-onedrive/auth/callback";

/// Tenant value that would turn the app into a multi-tenant one. Not supported.
const MULTI_TENANT_ID: &str = "common";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("OneDrive tenant ID must be configured. Set it in site settings to your Azure AD tenant ID.")]
    InvalidTenant,

    #[error("SharePoint base URL is not configured. Please set cs_discourse_onedrive_sharepoint_base_url in site settings.")]
    MissingSharePointBaseUrl,

    #[error("SharePoint site name is not configured. Please set cs_discourse_onedrive_sharepoint_site_name in site settings.")]
    MissingSharePointSiteName,

    #[error("SharePoint base URL is not a valid URL: {0}")]
    InvalidSharePointBaseUrl(String),

    #[error("Forum base URL is not configured. Please set discourse_base_url in site settings.")]
    MissingBaseUrl,
}

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SiteSettings {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub sharepoint_base_url: Option<String>,
    pub sharepoint_site_name: Option<String>,
    /// Public base URL of the forum, used to build the login redirect URI.
    pub base_url: Option<String>,
}

/// The SharePoint site the picker is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePointSite {
    pub base_url: String,
    pub site_name: String,
}

impl SharePointSite {
    /// Full site URL, e.g. `https://contoso.sharepoint.com/sites/Engineering`.
    pub fn site_url(&self) -> String {
        format!("{}/sites/{}", self.base_url, self.site_name)
    }
}

impl SiteSettings {
    /// Build settings from any key-value source (site settings, a HashMap, env...).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            client_id: read(CLIENT_ID_KEY),
            tenant_id: read(TENANT_ID_KEY),
            sharepoint_base_url: read(SHAREPOINT_BASE_URL_KEY)
                .map(|url| url.trim_end_matches('/').to_string()),
            sharepoint_site_name: read(SHAREPOINT_SITE_NAME_KEY),
            base_url: read(BASE_URL_KEY).map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    /// Load settings from environment variables (and a `.env` file if present).
    ///
    /// Each key is read upper-cased, e.g. `CS_DISCOURSE_ONEDRIVE_CLIENT_ID`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key.to_uppercase()).ok())
    }

    /// Tenant id, rejecting the missing and the multi-tenant (`common`) cases.
    pub fn tenant_id(&self) -> Result<&str, ConfigError> {
        match self.tenant_id.as_deref() {
            Some(tenant) if tenant != MULTI_TENANT_ID => Ok(tenant),
            _ => Err(ConfigError::InvalidTenant),
        }
    }

    pub fn sharepoint_base_url(&self) -> Result<&str, ConfigError> {
        self.sharepoint_base_url
            .as_deref()
            .ok_or(ConfigError::MissingSharePointBaseUrl)
    }

    /// Validate and return the SharePoint site the picker should open at.
    pub fn sharepoint_site(&self) -> Result<SharePointSite, ConfigError> {
        let base_url = self.sharepoint_base_url()?;
        let site_name = self
            .sharepoint_site_name
            .as_deref()
            .ok_or(ConfigError::MissingSharePointSiteName)?;

        Ok(SharePointSite {
            base_url: base_url.to_string(),
            site_name: site_name.to_string(),
        })
    }

    /// Absolute login redirect URI. The identity provider rejects relative ones.
    pub fn redirect_uri(&self) -> Result<String, ConfigError> {
        let base = self.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)?;
        Ok(format!("{base}{REDIRECT_PATH}"))
    }
}
