//! HTTP side of the portal: credential middleware, API client, menu and auth
//! endpoints, and the wiring that ties them to the session.

pub mod auth_api;
pub mod client;
pub mod config;
pub mod error;
pub mod menu_api;
pub mod middleware;
pub mod portal;

pub use auth_api::{AuthApi, AuthResponse, LoginRequest, RegisterRequest};
pub use client::{ApiClient, SharedClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use menu_api::MenuApi;
pub use middleware::CredentialMiddleware;
pub use portal::Portal;
