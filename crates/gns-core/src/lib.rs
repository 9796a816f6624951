//! Client library for the GNS notification platform.
//!
//! - [`auth`]: credential store, session storage backends and the session controller
//! - [`api`]: the request pipeline and its error taxonomy
//! - [`notify`]: the notification submission SDK
//! - [`routes`]: dashboard routes and the authentication guard

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod routes;

pub use api::{ApiError, RequestPipeline, TokenSource, UnauthorizedPolicy};
pub use auth::{CredentialStore, SessionController, SessionState};
pub use config::Config;
pub use models::UserInfo;
pub use notify::{Attachment, NotificationClient, Submission};
pub use routes::{guard, GuardDecision, Navigator, Route};
