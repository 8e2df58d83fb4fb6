//! Cross-context message protocol
//!
//! Embedded content posts small tagged messages to the host. The tag names
//! used by the proxied pages (`wiki-link`, `iframe-zoom`, `iframe-dblclick`)
//! are accepted as aliases of the canonical names.
//!
//! Anything that fails to parse is dropped by the router; see
//! [`InboundMessage::parse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message received from embedded content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// The user followed a link inside a frame.
    #[serde(rename = "link-followed", alias = "wiki-link", rename_all = "camelCase")]
    LinkFollowed {
        href: String,
        #[serde(default)]
        source_id: Option<String>,
    },

    /// Zoom/pan gesture captured inside a frame, in the frame's client space.
    #[serde(rename = "viewport-gesture", alias = "iframe-zoom", rename_all = "camelCase")]
    ViewportGesture {
        #[serde(default)]
        source_id: Option<String>,
        delta_y: f64,
        client_x: f64,
        client_y: f64,
    },

    /// Double-click inside a frame: focus the camera on it.
    #[serde(
        rename = "content-focus-request",
        alias = "iframe-dblclick",
        rename_all = "camelCase"
    )]
    ContentFocusRequest {
        #[serde(default)]
        source_id: Option<String>,
    },
}

impl InboundMessage {
    /// Parse a raw message payload. Returns `None` for unknown tags, missing
    /// required fields or wrongly-typed values.
    pub fn parse(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::LinkFollowed { .. } => "link-followed",
            InboundMessage::ViewportGesture { .. } => "viewport-gesture",
            InboundMessage::ContentFocusRequest { .. } => "content-focus-request",
        }
    }

    /// The frame hint carried by the message, if any.
    pub fn source_hint(&self) -> Option<&str> {
        match self {
            InboundMessage::LinkFollowed { source_id, .. }
            | InboundMessage::ViewportGesture { source_id, .. }
            | InboundMessage::ContentFocusRequest { source_id } => {
                source_id.as_deref().filter(|s| !s.is_empty())
            }
        }
    }
}

/// A search suggestion returned by the suggestion collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub url: String,
}
