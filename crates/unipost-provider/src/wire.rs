//! Wire types for the provider's postpone API.
//!
//! The provider accepts batches of posts but the client submits one post
//! per call so each account keeps an independent outcome.

use serde::{Deserialize, Serialize};
use unipost_models::{AccountKind, AccountTarget, Platform};

/// Destination account block inside a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostGroup {
    pub id: String,
    /// Platform wire code ("vk", "io", "gg", "pi")
    pub social: Platform,
    #[serde(rename = "type")]
    pub kind: AccountKind,
}

impl From<&AccountTarget> for PostGroup {
    fn from(target: &AccountTarget) -> Self {
        Self {
            id: target.id.as_str().to_string(),
            social: target.platform,
            kind: target.kind,
        }
    }
}

/// A post attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Text { text: String },
    Video { url: String },
}

/// One scheduled post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WirePost {
    pub group: PostGroup,
    pub attachments: Vec<Attachment>,
    /// Publish time as unix seconds
    pub date: i64,
}

impl WirePost {
    /// Build a post with the caption (when non-empty) leading the video.
    ///
    /// The provider renders attachments in order, so the text has to come
    /// first to appear above the player.
    pub fn new(group: PostGroup, caption: Option<&str>, video_url: &str, date: i64) -> Self {
        let mut attachments = Vec::with_capacity(2);
        if let Some(text) = caption {
            let text = text.trim();
            if !text.is_empty() {
                attachments.push(Attachment::Text {
                    text: text.to_string(),
                });
            }
        }
        attachments.push(Attachment::Video {
            url: video_url.to_string(),
        });
        Self {
            group,
            attachments,
            date,
        }
    }
}

/// Request body for `POST v1/posts/postpone`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostponeRequest {
    pub posts: Vec<WirePost>,
}

/// Response envelope shared by provider endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub response: Option<T>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: Option<String>,
}

/// Payload of a successful postpone call.
#[derive(Debug, Clone, Deserialize)]
pub struct PostponeResponse {
    #[serde(default)]
    pub posts: Vec<CreatedPost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> AccountTarget {
        AccountTarget::new("42", Platform::Vk, AccountKind::User)
    }

    #[test]
    fn test_post_group_wire_shape() {
        let group = PostGroup::from(&target());
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "42", "social": "vk", "type": "user"})
        );
    }

    #[test]
    fn test_attachments_tagged_by_type() {
        let post = WirePost::new(
            PostGroup::from(&target()),
            Some("watch this"),
            "https://cdn.example/v.mp4",
            1_700_000_000,
        );
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(
            json["attachments"],
            serde_json::json!([
                {"type": "text", "text": "watch this"},
                {"type": "video", "url": "https://cdn.example/v.mp4"}
            ])
        );
        assert_eq!(json["date"], serde_json::json!(1_700_000_000));
    }

    #[test]
    fn test_blank_caption_is_omitted() {
        let post = WirePost::new(PostGroup::from(&target()), Some("   "), "u", 0);
        assert_eq!(post.attachments.len(), 1);
        assert!(matches!(post.attachments[0], Attachment::Video { .. }));

        let post = WirePost::new(PostGroup::from(&target()), None, "u", 0);
        assert_eq!(post.attachments.len(), 1);
    }

    #[test]
    fn test_envelope_parses_error_payload() {
        let raw = r#"{"success": false, "error": {"message": "bad token"}}"#;
        let envelope: ApiEnvelope<PostponeResponse> = serde_json::from_str(raw).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.error.unwrap().message.unwrap(), "bad token");
    }

    #[test]
    fn test_envelope_parses_created_posts() {
        let raw = r#"{"success": true, "response": {"posts": [{"id": 9901}]}}"#;
        let envelope: ApiEnvelope<PostponeResponse> = serde_json::from_str(raw).unwrap();
        assert!(envelope.success);
        let posts = envelope.response.unwrap().posts;
        assert_eq!(posts[0].id, Some(9901));
    }
}
