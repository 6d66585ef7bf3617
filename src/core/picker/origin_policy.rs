use reqwest::Url;

/// Domain suffixes the picker popup may post messages from.
pub const ALLOWED_DOMAIN_SUFFIXES: &[&str] = &[".sharepoint.com", ".onedrive.live.com"];

/// Whether a `postMessage` origin belongs to SharePoint/OneDrive.
///
/// Subdomain-aware: `contoso.sharepoint.com` passes, while `evil-sharepoint.com`,
/// `sharepoint.com.evil.com` and a bare `.sharepoint.com` do not. Anything that
/// does not parse as a URL with a host is rejected.
pub fn is_allowed_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    ALLOWED_DOMAIN_SUFFIXES
        .iter()
        .any(|suffix| host.ends_with(suffix) && host.len() > suffix.len())
}
