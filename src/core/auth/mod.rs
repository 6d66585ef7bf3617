// Core auth module - token acquisition on top of an injected identity client.

pub mod auth_models;
pub mod identity_client;
pub mod token_broker;

pub use auth_models::{
    Account, IdentityClientConfig, RedirectLoginRequest, Resource, SilentTokenRequest,
    TokenResult,
};
pub use identity_client::{IdentityClient, IdentityClientFactory, IdentityError, PageSession};
pub use token_broker::{AuthError, TokenBroker};
