// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "settings/site_settings.rs"]
pub mod settings;

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "picker/mod.rs"]
pub mod picker;

#[path = "folders/mod.rs"]
pub mod folders;
