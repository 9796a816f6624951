//! SDK client for submitting notifications to a GNS server.
//!
//! The client is independent of any dashboard session: it is built with a
//! server URL and an API token issued from the dashboard, and sends that
//! token on every request.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use super::Submission;
use crate::api::{ApiError, PipelineBuilder, RequestPipeline, TokenSource};

/// Notification endpoint, relative to the server URL
pub const NOTIFY_PATH: &str = "/api/v1/notify";

/// Submissions can carry attachments, so this is longer than the dashboard's.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct NotificationClientBuilder {
    inner: PipelineBuilder,
}

impl NotificationClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    pub fn rate_limit_retries(mut self, retries: u32) -> Self {
        self.inner = self.inner.rate_limit_retries(retries);
        self
    }

    pub fn build(self) -> Result<NotificationClient, ApiError> {
        Ok(NotificationClient {
            pipeline: self.inner.build()?,
        })
    }
}

#[derive(Clone)]
pub struct NotificationClient {
    pipeline: RequestPipeline,
}

impl NotificationClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        Self::builder(base_url, token).build()
    }

    pub fn builder(base_url: &str, token: &str) -> NotificationClientBuilder {
        NotificationClientBuilder {
            inner: RequestPipeline::builder(base_url, TokenSource::Fixed(token.to_string()))
                .timeout(DEFAULT_NOTIFY_TIMEOUT),
        }
    }

    pub fn base_url(&self) -> &str {
        self.pipeline.base_url()
    }

    /// Submit a notification and return the server's response body as-is.
    pub async fn send_notification(&self, submission: &Submission) -> Result<Value, ApiError> {
        submission.validate()?;

        debug!(
            task_id = %submission.task_id,
            attachments = submission.attachments.len(),
            "Sending notification"
        );
        self.pipeline
            .send_json(Method::POST, NOTIFY_PATH, Some(submission))
            .await
    }
}
