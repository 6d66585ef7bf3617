// OneDrive topic folders: link SharePoint/OneDrive folders to forum topics.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic) and the traits it needs
// - `infra/` = Implementations of core traits (Graph API, forum backend, in-memory)
//
// The browser side (popup windows, message ports, the identity client) is never
// touched directly. The core describes those capabilities as traits and the host
// application plugs in whatever implements them.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::auth::{Account, AuthError, Resource, TokenBroker};
pub use crate::core::folders::{FolderContents, FolderDescriptor, FolderError, FolderService};
pub use crate::core::picker::{is_allowed_origin, PickerError, PickerService};
pub use crate::core::settings::{ConfigError, SiteSettings};
