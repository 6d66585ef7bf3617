// Core picker module - the SharePoint folder picker popup and its message protocol.

pub mod origin_policy;
pub mod picker_host;
pub mod picker_models;
pub mod picker_protocol;
mod picker_session;
pub mod picker_service;

pub use origin_policy::is_allowed_origin;
pub use picker_host::{
    FormSubmission, HostError, ListenerId, MessageListener, MessagePort, PickerForm, PickerHost,
    PopupWindow, WindowMessage,
};
pub use picker_models::{CancelReason, PickerError, PickerTimings};
pub use picker_service::PickerService;
