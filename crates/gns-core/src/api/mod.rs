//! HTTP plumbing for the GNS REST API.
//!
//! This module provides the `RequestPipeline` used by both the dashboard
//! session and the notification SDK, and the `ApiError` taxonomy every call
//! resolves to.
//!
//! The API uses bearer token authentication: dashboard sessions obtain the
//! token from `/auth/login`, SDK callers are issued one from the dashboard.

pub mod error;
pub mod pipeline;

pub use error::ApiError;
pub use pipeline::{
    PipelineBuilder, RequestPipeline, SessionExpiryHandler, TokenProvider, TokenSource,
    UnauthorizedPolicy, DEFAULT_TIMEOUT, LOGIN_PATH,
};
