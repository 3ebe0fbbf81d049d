//! Inbound relay request and the outbound `generateContent` body.

use serde::{Deserialize, Serialize};

use super::pool::TaskType;

/// Mime type attached to inline images when the caller does not name one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Request accepted by the relay endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub prompt: String,
    /// Task tag as sent by the caller. Resolved through [`TaskType::from_tag`].
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl RelayRequest {
    pub fn text(prompt: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            prompt: prompt.into(),
            task_type: Some(task_type.to_string()),
            base64_image: None,
            mime_type: None,
        }
    }

    /// Pool selector for this request. Missing or unknown tags give the default.
    pub fn task_type(&self) -> TaskType {
        self.task_type
            .as_deref()
            .map(TaskType::from_tag)
            .unwrap_or_default()
    }

    /// The tag to report back to the caller: the raw tag if one was sent.
    pub fn task_label(&self) -> String {
        self.task_type
            .clone()
            .unwrap_or_else(|| self.task_type().to_string())
    }

    pub fn with_image(mut self, base64_image: impl Into<String>) -> Self {
        self.base64_image = Some(base64_image.into());
        self
    }

    /// The inline image, ignoring an empty string the same way as an absent one.
    pub fn inline_image(&self) -> Option<&str> {
        self.base64_image.as_deref().filter(|s| !s.is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.inline_image().is_some()
    }

    /// Build the upstream body: one content block, text first, image second.
    pub fn to_generate_request(&self) -> GenerateRequest {
        let mut parts = vec![Part::Text {
            text: self.prompt.clone(),
        }];
        if let Some(data) = self.inline_image() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: self
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
                    data: data.to_string(),
                },
            });
        }
        GenerateRequest {
            contents: vec![Content { parts }],
        }
    }
}

/// Body of a `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_body() {
        let req = RelayRequest::text("hello", TaskType::Tools);
        let body = serde_json::to_value(req.to_generate_request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn image_body_has_inline_part() {
        let req = RelayRequest::text("what is this", TaskType::Food).with_image("AAAA");
        let body = serde_json::to_value(req.to_generate_request()).unwrap();
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "AAAA");
    }

    #[test]
    fn accepts_legacy_type_field() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"prompt": "p", "type": "analyzer"}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Analyzer);
        assert!(!req.has_image());
    }

    #[test]
    fn missing_task_type_defaults() {
        let req: RelayRequest = serde_json::from_str(r#"{"prompt": "p"}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Dashboard);
        assert_eq!(req.task_label(), "dashboard");
    }

    #[test]
    fn unknown_tag_keeps_raw_label() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"prompt": "p", "taskType": "poetry"}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Dashboard);
        assert_eq!(req.task_label(), "poetry");
    }

    #[test]
    fn null_tag_is_default() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"prompt": "p", "taskType": null}"#).unwrap();
        assert_eq!(req.task_type(), TaskType::Dashboard);
    }

    #[test]
    fn empty_image_counts_as_absent() {
        let req: RelayRequest =
            serde_json::from_str(r#"{"prompt": "p", "taskType": "food", "base64Image": ""}"#)
                .unwrap();
        assert!(!req.has_image());
        assert_eq!(req.to_generate_request().contents[0].parts.len(), 1);
    }

    #[test]
    fn custom_mime_type_is_used() {
        let mut req = RelayRequest::text("p", TaskType::Food).with_image("BBBB");
        req.mime_type = Some("image/png".into());
        match &req.to_generate_request().contents[0].parts[1] {
            Part::InlineData { inline_data } => assert_eq!(inline_data.mime_type, "image/png"),
            other => panic!("expected inline data, got {other:?}"),
        }
    }
}
