// Picker service - opens the hosted SharePoint folder picker.
//
// This service handles:
// - Validating the SharePoint site before anything is opened
// - Getting the SharePoint token the picker form is posted with
// - Building the picker URL and form
// - Handing the popup to a `PickerSession` that runs until it settles
//
// NO browser code here - the host is a trait object.

use super::picker_host::{PickerForm, PickerHost};
use super::picker_models::{PickerError, PickerTimings};
use super::picker_session::PickerSession;
use crate::core::auth::{Account, Resource, TokenBroker};
use crate::core::folders::FolderDescriptor;
use crate::core::settings::{ConfigError, SharePointSite};
use rand::Rng;
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;

pub const POPUP_NAME: &str = "OneDrivePicker";
pub const POPUP_FEATURES: &str = "width=800,height=600,resizable=yes,scrollbars=yes";

const PICKER_PAGE_PATH: &str = "/_layouts/15/FilePicker.aspx";
const PICKER_SDK_VERSION: &str = "8.0";
const FORM_TITLE: &str = "OneDrive Picker";
const TOKEN_FIELD: &str = "access_token";

const CHANNEL_ID_LEN: usize = 13;
const CHANNEL_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub struct PickerService {
    broker: Arc<TokenBroker>,
    host: Arc<dyn PickerHost>,
    timings: PickerTimings,
}

impl PickerService {
    pub fn new(broker: Arc<TokenBroker>, host: Arc<dyn PickerHost>) -> Self {
        Self {
            broker,
            host,
            timings: PickerTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: PickerTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Open the picker and wait for the user to choose a folder.
    ///
    /// # Errors
    /// - `Config` when the SharePoint site is not configured
    /// - `NoToken` when no SharePoint token could be obtained
    /// - `PopupBlocked` when the popup did not open
    /// - `Cancelled` when the user closed the picker or picked nothing
    /// - `Timeout` / `FormSubmission` when the picker never got going
    pub async fn open_picker(
        &self,
        account: Option<Account>,
    ) -> Result<FolderDescriptor, PickerError> {
        let site = self.broker.settings().sharepoint_site()?;

        let token = self
            .broker
            .acquire_access_token(account.as_ref(), true, Resource::SharePoint)
            .await?
            .ok_or(PickerError::NoToken)?;

        let channel_id = generate_channel_id();
        let action = picker_url(&site, &self.host.origin(), &channel_id)?;

        let Some(popup) = self.host.open_popup(POPUP_NAME, POPUP_FEATURES) else {
            tracing::warn!("Picker popup was blocked");
            return Err(PickerError::PopupBlocked);
        };

        tracing::info!(%channel_id, site = %site.site_url(), "Opening OneDrive picker");

        let form = PickerForm {
            title: FORM_TITLE.to_string(),
            action: action.to_string(),
            method: "POST".to_string(),
            fields: vec![(TOKEN_FIELD.to_string(), token)],
        };

        PickerSession::new(
            Arc::clone(&self.host),
            popup,
            Arc::clone(&self.broker),
            account,
            channel_id,
            form,
            self.timings,
        )
        .run()
        .await
    }
}

/// Random base36 id tying the popup's handshake to this session.
fn generate_channel_id() -> String {
    let mut rng = rand::thread_rng();
    (0..CHANNEL_ID_LEN)
        .map(|_| CHANNEL_ID_ALPHABET[rng.gen_range(0..CHANNEL_ID_ALPHABET.len())] as char)
        .collect()
}

/// `FilePicker.aspx` URL carrying the v8 picker parameters as JSON.
fn picker_url(site: &SharePointSite, origin: &str, channel_id: &str) -> Result<Url, ConfigError> {
    let site_url = site.site_url();
    let params = json!({
        "sdk": PICKER_SDK_VERSION,
        "messaging": {
            "origin": origin,
            "channelId": channel_id,
        },
        "entry": {
            "sharePoint": { "byPath": { "web": site_url } },
        },
        "authentication": {},
        "typesAndSources": {
            "mode": "folders",
            "filters": ["folder"],
            "locations": {
                "sharePoint": { "byPath": { "web": site_url } },
            },
            "pivots": {
                "oneDrive": false,
                "recent": false,
                "shared": false,
                "sharedLibraries": false,
                "myOrganization": false,
                "site": false,
            },
        },
    });

    Url::parse_with_params(
        &format!("{}{PICKER_PAGE_PATH}", site.base_url),
        &[("filePicker", params.to_string())],
    )
    .map_err(|e| ConfigError::InvalidSharePointBaseUrl(e.to_string()))
}
