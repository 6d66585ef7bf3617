// Picker session - one open picker popup from handshake to settlement.
//
// Everything that can end the session is a branch of a single `select!` loop:
// - the overall deadline
// - the closed-window poll
// - form submission retries
// - window messages (the handshake) and port messages (the commands)
//
// Only this loop touches session state, so the first terminal branch wins and
// nothing after it is observed. Teardown runs once, on exit or on drop.

use super::origin_policy::is_allowed_origin;
use super::picker_host::{
    FormSubmission, ListenerId, MessagePort, PickerForm, PickerHost, PopupWindow, WindowMessage,
};
use super::picker_models::{CancelReason, PickerError, PickerTimings};
use super::picker_protocol::{
    handshake_channel_id, PickedItem, PickerCommand, PortInbound, PortOutbound, ResultData,
};
use crate::core::auth::{Account, Resource, TokenBroker};
use crate::core::folders::FolderDescriptor;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};

type Outcome = Result<FolderDescriptor, PickerError>;

pub(crate) struct PickerSession {
    host: Arc<dyn PickerHost>,
    popup: Arc<dyn PopupWindow>,
    broker: Arc<TokenBroker>,
    account: Option<Account>,
    channel_id: String,
    form: PickerForm,
    timings: PickerTimings,
    listener_id: Option<ListenerId>,
    port: Option<Arc<dyn MessagePort>>,
    auth_tasks: JoinSet<()>,
    torn_down: bool,
}

impl PickerSession {
    pub(crate) fn new(
        host: Arc<dyn PickerHost>,
        popup: Arc<dyn PopupWindow>,
        broker: Arc<TokenBroker>,
        account: Option<Account>,
        channel_id: String,
        form: PickerForm,
        timings: PickerTimings,
    ) -> Self {
        Self {
            host,
            popup,
            broker,
            account,
            channel_id,
            form,
            timings,
            listener_id: None,
            port: None,
            auth_tasks: JoinSet::new(),
            torn_down: false,
        }
    }

    /// Drive the session until it settles, then tear it down.
    pub(crate) async fn run(mut self) -> Outcome {
        let outcome = self.event_loop().await;
        self.teardown();

        match &outcome {
            Ok(folder) => tracing::info!(
                channel_id = %self.channel_id,
                drive_id = %folder.drive_id,
                "Folder picked"
            ),
            Err(e) if e.is_cancellation() => {
                tracing::info!(channel_id = %self.channel_id, reason = %e, "Picker cancelled")
            }
            Err(e) => tracing::warn!(channel_id = %self.channel_id, error = %e, "Picker failed"),
        }

        outcome
    }

    async fn event_loop(&mut self) -> Outcome {
        let listener = self.host.add_message_listener();
        self.listener_id = Some(listener.id);
        let mut window_messages = Some(listener.messages);
        let mut port_messages: Option<UnboundedReceiver<Value>> = None;

        let deadline = time::sleep(self.timings.timeout);
        tokio::pin!(deadline);

        let poll_every = self.timings.window_monitor_interval;
        let mut window_poll = time::interval_at(Instant::now() + poll_every, poll_every);
        window_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let form_timer = time::sleep(self.timings.form_submit_delay);
        tokio::pin!(form_timer);
        let mut form_pending = true;
        let mut form_attempts = 0u32;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(PickerError::Timeout(self.timings.timeout));
                }

                _ = window_poll.tick() => {
                    if self.popup.is_closed() {
                        return Err(PickerError::Cancelled(CancelReason::WindowClosed));
                    }
                }

                _ = &mut form_timer, if form_pending => {
                    form_attempts += 1;
                    match self.popup.submit_form(&self.form) {
                        Ok(FormSubmission::Submitted) => {
                            tracing::debug!(channel_id = %self.channel_id, attempts = form_attempts, "Picker form submitted");
                            form_pending = false;
                        }
                        Ok(FormSubmission::NotReady) if form_attempts < self.timings.form_submit_max_retries => {
                            let retry_at = Instant::now() + self.timings.form_submit_retry_delay;
                            form_timer.as_mut().reset(retry_at);
                        }
                        Ok(FormSubmission::NotReady) => {
                            return Err(PickerError::FormSubmission(
                                "window document not available".to_string(),
                            ));
                        }
                        Err(e) => return Err(PickerError::FormSubmission(e.0)),
                    }
                }

                message = next_message(&mut window_messages) => match message {
                    Some(message) => {
                        if let Some(inbound) = self.accept_handshake(message) {
                            port_messages = Some(inbound);
                        }
                    }
                    None => window_messages = None,
                },

                message = next_message(&mut port_messages) => match message {
                    Some(message) => {
                        if let Some(outcome) = self.handle_port_message(message) {
                            return outcome;
                        }
                    }
                    None => {
                        tracing::debug!(channel_id = %self.channel_id, "Picker port closed by remote");
                        port_messages = None;
                    }
                },

                Some(joined) = self.auth_tasks.join_next(), if !self.auth_tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(channel_id = %self.channel_id, "Authenticate task panicked");
                        }
                    }
                }
            }
        }
    }

    // ========================================================================
    // WINDOW LEVEL
    // ========================================================================

    /// Capture the port of a valid handshake and activate the picker.
    ///
    /// Returns the port's inbound receiver when the handshake was accepted.
    fn accept_handshake(&mut self, message: WindowMessage) -> Option<UnboundedReceiver<Value>> {
        if !is_allowed_origin(&message.origin) {
            tracing::debug!(origin = %message.origin, "Ignoring message from disallowed origin");
            return None;
        }

        let channel_id = handshake_channel_id(&message.data)?;
        if channel_id != self.channel_id {
            tracing::debug!(
                expected = %self.channel_id,
                received = %channel_id,
                "Ignoring handshake for another picker channel"
            );
            return None;
        }
        if self.port.is_some() {
            tracing::debug!(channel_id = %self.channel_id, "Ignoring repeated handshake");
            return None;
        }

        let port = message.ports.into_iter().next()?;
        let inbound = port.start();
        self.port = Some(port);

        tracing::debug!(channel_id = %self.channel_id, "Picker channel established");
        self.post(PortOutbound::Activate);
        Some(inbound)
    }

    // ========================================================================
    // PORT LEVEL
    // ========================================================================

    /// Handle one port message. `Some` means the session has settled.
    fn handle_port_message(&mut self, message: Value) -> Option<Outcome> {
        let (id, command) = match PortInbound::parse(&message) {
            Ok(PortInbound::Command { id, command }) => (id, command),
            Ok(PortInbound::Notification) => return None,
            Ok(PortInbound::Other(kind)) => {
                tracing::debug!(%kind, "Ignoring picker message");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed picker message");
                return None;
            }
        };

        self.post(PortOutbound::Acknowledge { id: id.clone() });

        match command {
            PickerCommand::Authenticate => {
                self.spawn_authenticate(id);
                None
            }

            PickerCommand::Pick { items } => match PickedItem::first_of(&items) {
                Some(item) => {
                    self.post(PortOutbound::Result {
                        id,
                        data: ResultData::Success,
                    });
                    Some(Ok(item.into_descriptor()))
                }
                None => {
                    self.post(PortOutbound::error(
                        id,
                        "noSelection",
                        "No folder selected",
                        false,
                    ));
                    Some(Err(PickerError::Cancelled(CancelReason::NoSelection)))
                }
            },

            PickerCommand::Close => Some(Err(PickerError::Cancelled(CancelReason::CloseCommand))),

            PickerCommand::Unsupported(name) => {
                tracing::debug!(command = %name, "Unsupported picker command");
                self.post(PortOutbound::error(id, "unsupportedCommand", name, true));
                None
            }
        }
    }

    /// Answer an `authenticate` command in the background.
    ///
    /// The token request may take a while (or start a login redirect), so the
    /// loop keeps serving the port meanwhile.
    fn spawn_authenticate(&mut self, id: Value) {
        let Some(port) = self.port.clone() else {
            return;
        };
        let broker = Arc::clone(&self.broker);
        let account = self.account.clone();
        let channel_id = self.channel_id.clone();

        self.auth_tasks.spawn(async move {
            let reply = match broker
                .acquire_access_token(account.as_ref(), true, Resource::SharePoint)
                .await
            {
                Ok(Some(token)) => PortOutbound::Result {
                    id,
                    data: ResultData::Token { token },
                },
                Ok(None) => PortOutbound::error(
                    id,
                    "unableToObtainToken",
                    "No access token available",
                    false,
                ),
                Err(e) => {
                    tracing::warn!(%channel_id, error = %e, "Picker token request failed");
                    PortOutbound::error(id, "unableToObtainToken", e.to_string(), false)
                }
            };

            if let Err(e) = port.post_message(reply.to_value()) {
                tracing::warn!(%channel_id, error = %e, "Failed to answer authenticate command");
            }
        });
    }

    fn post(&self, message: PortOutbound) {
        let Some(port) = &self.port else {
            return;
        };
        if let Err(e) = port.post_message(message.to_value()) {
            tracing::warn!(channel_id = %self.channel_id, error = %e, "Failed to post to picker port");
        }
    }

    // ========================================================================
    // TEARDOWN
    // ========================================================================

    /// Release every resource the session holds. Safe to call more than once.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(id) = self.listener_id.take() {
            self.host.remove_message_listener(id);
        }
        if let Some(port) = self.port.take() {
            if let Err(e) = port.close() {
                tracing::warn!(channel_id = %self.channel_id, error = %e, "Failed to close picker port");
            }
        }
        self.popup.close();
        self.auth_tasks.abort_all();
    }
}

impl Drop for PickerSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Next message of an optional receiver; never resolves while there is none.
async fn next_message<T>(receiver: &mut Option<UnboundedReceiver<T>>) -> Option<T> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
