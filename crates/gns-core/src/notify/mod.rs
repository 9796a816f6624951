//! Notification delivery SDK.
//!
//! `NotificationClient` posts a `Submission` (task id, template variables,
//! optional attachments and priority) to the server's notify endpoint.

pub mod client;
pub mod submission;

pub use client::{NotificationClient, NotificationClientBuilder, DEFAULT_NOTIFY_TIMEOUT, NOTIFY_PATH};
pub use submission::{Attachment, AttachmentContent, Submission};
