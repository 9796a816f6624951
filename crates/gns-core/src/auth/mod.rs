//! Authentication module for managing the dashboard session.
//!
//! This module provides:
//! - `CredentialStore`: the current bearer token and identity snapshot
//! - `Storage`: durable backends the store persists through (file, keychain, memory)
//! - `SessionController`: login, registration, logout and identity refresh
//!
//! Sessions have no client-side expiry; they last until the server answers
//! an authenticated call with 401.

pub mod credentials;
pub mod session;
pub mod storage;

pub use credentials::{CredentialStore, Credentials, TOKEN_KEY, USER_KEY};
pub use session::{dashboard_pipeline, SessionController, SessionExpiry, SessionState, ME_PATH, REGISTER_PATH};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage};
