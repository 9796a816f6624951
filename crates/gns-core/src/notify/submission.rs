use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::api::ApiError;

/// Attachment body. Raw bytes go over the wire base64 encoded; text is
/// sent as-is, so content that is already base64 should be passed as text.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl Serialize for AttachmentContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttachmentContent::Text(text) => serializer.serialize_str(text),
            AttachmentContent::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content: AttachmentContent,
}

impl Attachment {
    pub fn text(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: AttachmentContent::Text(content.into()),
        }
    }

    pub fn bytes(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: AttachmentContent::Bytes(content.into()),
        }
    }
}

/// One notification request against a pre-configured task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub task_id: String,
    /// Template variables. Must be present; may be empty.
    pub data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl Submission {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..Default::default()
        }
    }

    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Set a single template variable, creating the data map if needed
    pub fn var(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Caller-side checks run before anything touches the network.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.task_id.trim().is_empty() {
            return Err(ApiError::Validation("taskId is required".to_string()));
        }
        if self.data.is_none() {
            return Err(ApiError::Validation("data is required".to_string()));
        }
        Ok(())
    }
}
