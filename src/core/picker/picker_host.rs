// Ports for the browser pieces the picker session drives.
//
// Browser APIs are synchronous and callback based. Here callbacks become
// channels: a window listener or a started port hands back a receiver and the
// session pulls messages from it.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

/// Identifies a registered window message listener so it can be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A `message` event delivered to the opener window.
#[derive(Clone)]
pub struct WindowMessage {
    pub origin: String,
    pub data: Value,
    pub ports: Vec<Arc<dyn MessagePort>>,
}

impl std::fmt::Debug for WindowMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowMessage")
            .field("origin", &self.origin)
            .field("data", &self.data)
            .field("ports", &self.ports.len())
            .finish()
    }
}

pub struct MessageListener {
    pub id: ListenerId,
    pub messages: UnboundedReceiver<WindowMessage>,
}

/// An auto-submitting POST form written into the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerForm {
    pub title: String,
    pub action: String,
    pub method: String,
    /// Hidden input fields, in order.
    pub fields: Vec<(String, String)>,
}

/// Result of one attempt to write the form into the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSubmission {
    Submitted,
    /// The popup has no document yet; try again shortly.
    NotReady,
}

/// The opener page.
pub trait PickerHost: Send + Sync {
    /// Origin of the opener page, announced to the picker for postMessage.
    fn origin(&self) -> String;

    /// `None` when the popup could not be opened (usually a popup blocker).
    fn open_popup(&self, name: &str, features: &str) -> Option<Arc<dyn PopupWindow>>;

    fn add_message_listener(&self) -> MessageListener;

    fn remove_message_listener(&self, id: ListenerId);
}

pub trait PopupWindow: Send + Sync {
    fn is_closed(&self) -> bool;

    fn close(&self);

    fn submit_form(&self, form: &PickerForm) -> Result<FormSubmission, HostError>;
}

pub trait MessagePort: Send + Sync {
    /// Attach a listener and start delivery.
    fn start(&self) -> UnboundedReceiver<Value>;

    fn post_message(&self, message: Value) -> Result<(), HostError>;

    fn close(&self) -> Result<(), HostError>;
}
