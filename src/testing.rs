// Test doubles for the browser-side ports.
//
// Everything records what it was asked to do so tests can assert on it.

use crate::core::auth::{
    Account, IdentityClient, IdentityClientConfig, IdentityClientFactory, IdentityError,
    PageSession, RedirectLoginRequest, SilentTokenRequest, TokenBroker, TokenResult,
};
use crate::core::picker::{
    FormSubmission, HostError, ListenerId, MessageListener, MessagePort, PickerForm, PickerHost,
    PopupWindow, WindowMessage,
};
use crate::core::settings::{
    SiteSettings, BASE_URL_KEY, CLIENT_ID_KEY, SHAREPOINT_BASE_URL_KEY, SHAREPOINT_SITE_NAME_KEY,
    TENANT_ID_KEY,
};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Url;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub const SHAREPOINT_ORIGIN: &str = "https://contoso.sharepoint.com";
pub const FORUM_ORIGIN: &str = "https://forum.example.com";

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ============================================================================
// SETTINGS
// ============================================================================

pub fn test_settings() -> SiteSettings {
    SiteSettings::from_lookup(|key| {
        let value = match key {
            CLIENT_ID_KEY => "client-123",
            TENANT_ID_KEY => "contoso-tenant",
            SHAREPOINT_BASE_URL_KEY => "https://contoso.sharepoint.com",
            SHAREPOINT_SITE_NAME_KEY => "Engineering",
            BASE_URL_KEY => FORUM_ORIGIN,
            _ => return None,
        };
        Some(value.to_string())
    })
}

pub fn test_account() -> Account {
    Account {
        home_account_id: "uid.tid".to_string(),
        username: "alex@contoso.com".to_string(),
        tenant_id: Some("contoso-tenant".to_string()),
    }
}

// ============================================================================
// IDENTITY
// ============================================================================

pub struct FakeIdentityClient {
    pub silent_result: Mutex<Result<String, IdentityError>>,
    pub silent_requests: Mutex<Vec<SilentTokenRequest>>,
    pub login_requests: Mutex<Vec<RedirectLoginRequest>>,
    pub logout_accounts: Mutex<Vec<Account>>,
    pub init_calls: AtomicUsize,
    pub redirect_calls: AtomicUsize,
}

impl FakeIdentityClient {
    fn with_silent_result(result: Result<String, IdentityError>) -> Self {
        Self {
            silent_result: Mutex::new(result),
            silent_requests: Mutex::new(Vec::new()),
            login_requests: Mutex::new(Vec::new()),
            logout_accounts: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            redirect_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_token(token: &str) -> Self {
        Self::with_silent_result(Ok(token.to_string()))
    }

    pub fn failing_silent(error: IdentityError) -> Self {
        Self::with_silent_result(Err(error))
    }
}

#[async_trait]
impl IdentityClient for FakeIdentityClient {
    async fn initialize(&self) -> Result<(), IdentityError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        // Long enough for a concurrent caller to arrive mid-initialization.
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }

    async fn handle_redirect_promise(&self) -> Result<(), IdentityError> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        vec![test_account()]
    }

    async fn acquire_token_silent(
        &self,
        request: SilentTokenRequest,
    ) -> Result<TokenResult, IdentityError> {
        self.silent_requests.lock().unwrap().push(request);
        self.silent_result
            .lock()
            .unwrap()
            .clone()
            .map(|access_token| TokenResult { access_token })
    }

    async fn login_redirect(&self, request: RedirectLoginRequest) -> Result<(), IdentityError> {
        self.login_requests.lock().unwrap().push(request);
        Ok(())
    }

    async fn logout_redirect(&self, account: &Account) -> Result<(), IdentityError> {
        self.logout_accounts.lock().unwrap().push(account.clone());
        Ok(())
    }
}

pub struct FakeIdentityFactory {
    pub client: Arc<FakeIdentityClient>,
    pub created: AtomicUsize,
    pub configs: Mutex<Vec<IdentityClientConfig>>,
}

impl IdentityClientFactory for FakeIdentityFactory {
    fn create(&self, config: IdentityClientConfig) -> Arc<dyn IdentityClient> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config);
        self.client.clone()
    }
}

pub struct FakePage {
    pub url: String,
    pub remembered: Mutex<Vec<(String, String)>>,
}

impl PageSession for FakePage {
    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn remember_redirect_page(&self, key: &str, url: &str) {
        self.remembered
            .lock()
            .unwrap()
            .push((key.to_string(), url.to_string()));
    }
}

pub fn broker_with(
    client: FakeIdentityClient,
    settings: SiteSettings,
) -> (Arc<TokenBroker>, Arc<FakeIdentityFactory>, Arc<FakePage>) {
    let factory = Arc::new(FakeIdentityFactory {
        client: Arc::new(client),
        created: AtomicUsize::new(0),
        configs: Mutex::new(Vec::new()),
    });
    let page = Arc::new(FakePage {
        url: format!("{FORUM_ORIGIN}/t/quarterly-report/42"),
        remembered: Mutex::new(Vec::new()),
    });
    let broker = Arc::new(TokenBroker::new(settings, factory.clone(), page.clone()));
    (broker, factory, page)
}

// ============================================================================
// PICKER HOST
// ============================================================================

/// Opener page with a single scripted popup.
pub struct FakeHost {
    popup: Arc<FakePopup>,
    block_popups: bool,
    listeners: DashMap<u64, UnboundedSender<WindowMessage>>,
    next_listener: AtomicU64,
    pub open_calls: AtomicUsize,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    pub fn blocking_popups() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    fn build(block_popups: bool) -> Self {
        Self {
            popup: Arc::new(FakePopup::default()),
            block_popups,
            listeners: DashMap::new(),
            next_listener: AtomicU64::new(1),
            open_calls: AtomicUsize::new(0),
        }
    }

    /// The popup `open_popup` hands out.
    pub fn popup(&self) -> Arc<FakePopup> {
        self.popup.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a window `message` event to every registered listener.
    pub fn dispatch(&self, origin: &str, data: Value, ports: Vec<Arc<FakePort>>) {
        let ports: Vec<Arc<dyn MessagePort>> = ports
            .into_iter()
            .map(|port| port as Arc<dyn MessagePort>)
            .collect();
        for listener in self.listeners.iter() {
            let _ = listener.value().send(WindowMessage {
                origin: origin.to_string(),
                data: data.clone(),
                ports: ports.clone(),
            });
        }
    }
}

impl PickerHost for FakeHost {
    fn origin(&self) -> String {
        FORUM_ORIGIN.to_string()
    }

    fn open_popup(&self, _name: &str, _features: &str) -> Option<Arc<dyn PopupWindow>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.block_popups {
            return None;
        }
        Some(self.popup.clone())
    }

    fn add_message_listener(&self) -> MessageListener {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);
        MessageListener {
            id: ListenerId(id),
            messages: rx,
        }
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.listeners.remove(&id.0);
    }
}

#[derive(Default)]
pub struct FakePopup {
    pub closed: AtomicBool,
    pub close_calls: AtomicUsize,
    /// How many submit attempts report a missing document before one succeeds.
    pub not_ready_attempts: AtomicU32,
    pub submit_attempts: AtomicU32,
    pub submit_error: Mutex<Option<String>>,
    submitted: Mutex<Vec<PickerForm>>,
}

impl FakePopup {
    pub fn submitted_forms(&self) -> Vec<PickerForm> {
        self.submitted.lock().unwrap().clone()
    }

    /// Channel id announced in the submitted form's picker parameters.
    pub fn channel_id(&self) -> Option<String> {
        let form = self.submitted.lock().unwrap().first().cloned()?;
        let params = picker_params(&form.action)?;
        params["messaging"]["channelId"]
            .as_str()
            .map(str::to_string)
    }
}

impl PopupWindow for FakePopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }

    fn submit_form(&self, form: &PickerForm) -> Result<FormSubmission, HostError> {
        let attempt = self.submit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(HostError(message));
        }
        if attempt <= self.not_ready_attempts.load(Ordering::SeqCst) {
            return Ok(FormSubmission::NotReady);
        }
        self.submitted.lock().unwrap().push(form.clone());
        Ok(FormSubmission::Submitted)
    }
}

/// One end of a message channel; tests play the picker on the other end.
pub struct FakePort {
    to_session: UnboundedSender<Value>,
    inbound: Mutex<Option<UnboundedReceiver<Value>>>,
    pub started: AtomicBool,
    pub close_calls: AtomicUsize,
    pub close_error: Mutex<Option<String>>,
    posted: Mutex<Vec<Value>>,
}

impl FakePort {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            to_session: tx,
            inbound: Mutex::new(Some(rx)),
            started: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            close_error: Mutex::new(None),
            posted: Mutex::new(Vec::new()),
        })
    }

    /// Send a message as the picker. Queued until the port is started.
    pub fn send(&self, message: Value) {
        let _ = self.to_session.send(message);
    }

    pub fn posted(&self) -> Vec<Value> {
        self.posted.lock().unwrap().clone()
    }
}

impl MessagePort for FakePort {
    fn start(&self) -> UnboundedReceiver<Value> {
        self.started.store(true, Ordering::SeqCst);
        self.inbound
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| mpsc::unbounded_channel().1)
    }

    fn post_message(&self, message: Value) -> Result<(), HostError> {
        self.posted.lock().unwrap().push(message);
        Ok(())
    }

    fn close(&self) -> Result<(), HostError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        match self.close_error.lock().unwrap().clone() {
            Some(message) => Err(HostError(message)),
            None => Ok(()),
        }
    }
}

/// Decode the `filePicker` JSON out of a picker URL.
pub fn picker_params(url: &str) -> Option<Value> {
    let url = Url::parse(url).ok()?;
    let (_, raw) = url.query_pairs().find(|(key, _)| key == "filePicker")?;
    serde_json::from_str(&raw).ok()
}
