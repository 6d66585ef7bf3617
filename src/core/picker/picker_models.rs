use crate::core::auth::AuthError;
use crate::core::settings::ConfigError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const PICKER_TIMEOUT: Duration = Duration::from_secs(60);
pub const WINDOW_MONITOR_INTERVAL: Duration = Duration::from_millis(500);
pub const FORM_SUBMIT_DELAY: Duration = Duration::from_millis(100);
pub const FORM_SUBMIT_RETRY_DELAY: Duration = Duration::from_millis(50);
/// ~5 seconds of retries at the default delay.
pub const FORM_SUBMIT_MAX_RETRIES: u32 = 100;

/// Timers and retry bounds of a picker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerTimings {
    pub timeout: Duration,
    pub window_monitor_interval: Duration,
    pub form_submit_delay: Duration,
    pub form_submit_retry_delay: Duration,
    pub form_submit_max_retries: u32,
}

impl Default for PickerTimings {
    fn default() -> Self {
        Self {
            timeout: PICKER_TIMEOUT,
            window_monitor_interval: WINDOW_MONITOR_INTERVAL,
            form_submit_delay: FORM_SUBMIT_DELAY,
            form_submit_retry_delay: FORM_SUBMIT_RETRY_DELAY,
            form_submit_max_retries: FORM_SUBMIT_MAX_RETRIES,
        }
    }
}

/// Why the user walked away from the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    WindowClosed,
    CloseCommand,
    NoSelection,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::WindowClosed | CancelReason::CloseCommand => f.write_str("cancelled"),
            CancelReason::NoSelection => f.write_str("A folder must be selected"),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum PickerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("No SharePoint access token available")]
    NoToken,

    #[error("Failed to open picker window - popup may be blocked")]
    PopupBlocked,

    #[error("Failed to submit picker form: {0}")]
    FormSubmission(String),

    #[error("OneDrive picker timed out - no response after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Cancelled(CancelReason),
}

impl PickerError {
    /// User cancellations are not failures; callers usually skip the error toast.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PickerError::Cancelled(_))
    }
}
