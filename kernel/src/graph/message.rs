//! Message payload types.
//!
//! Content blocks are opaque to the graph: the kernel only needs them to be
//! structured data that survives an export/import cycle unchanged.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user input.
    User,
    /// Model output.
    Assistant,
    /// System prompt or structural note (merges use it by convention).
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Plain text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// The text.
    pub text: String,
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    /// Tool call identifier, referenced by the matching result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    pub input: Value,
}

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    /// Identifier of the tool call this answers.
    pub tool_use_id: String,
    /// Result payload, either a string or a list of blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Whether the tool failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// One block of structured message content.
///
/// Known block kinds are typed; anything else, including known kinds that
/// carry fields this crate does not model, is kept verbatim as `Opaque`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// `{"type": "text", ...}`
    Text(TextBlock),
    /// `{"type": "tool_use", ...}`
    ToolUse(ToolUseBlock),
    /// `{"type": "tool_result", ...}`
    ToolResult(ToolResultBlock),
    /// Unknown or richer block, stored as raw JSON.
    Opaque(Value),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
    ToolResult(ToolResultBlock),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedBlockRef<'a> {
    Text(&'a TextBlock),
    ToolUse(&'a ToolUseBlock),
    ToolResult(&'a ToolResultBlock),
}

impl From<TaggedBlock> for ContentBlock {
    fn from(block: TaggedBlock) -> Self {
        match block {
            TaggedBlock::Text(b) => Self::Text(b),
            TaggedBlock::ToolUse(b) => Self::ToolUse(b),
            TaggedBlock::ToolResult(b) => Self::ToolResult(b),
        }
    }
}

impl ContentBlock {
    /// Creates a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextBlock { text: text.into() })
    }

    /// Classifies a raw JSON block.
    ///
    /// A typed variant is chosen only when it re-serializes to exactly the
    /// same JSON, so no field is ever dropped.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let known = matches!(
            value.get("type").and_then(Value::as_str),
            Some("text" | "tool_use" | "tool_result")
        );
        if known {
            if let Ok(tagged) = serde_json::from_value::<TaggedBlock>(value.clone()) {
                if serde_json::to_value(&tagged).is_ok_and(|back| back == value) {
                    return tagged.into();
                }
            }
        }
        Self::Opaque(value)
    }

    /// Returns the block's `type` tag, if it has one.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Text(_) => Some("text"),
            Self::ToolUse(_) => Some("tool_use"),
            Self::ToolResult(_) => Some("tool_result"),
            Self::Opaque(value) => value.get("type").and_then(Value::as_str),
        }
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(b) => TaggedBlockRef::Text(b).serialize(serializer),
            Self::ToolUse(b) => TaggedBlockRef::ToolUse(b).serialize(serializer),
            Self::ToolResult(b) => TaggedBlockRef::ToolResult(b).serialize(serializer),
            Self::Opaque(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(de::Error::custom("content block must be a JSON object"));
        }
        Ok(Self::from_value(value))
    }
}

/// Message content: a plain string or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text.
    Text(String),
    /// Structured blocks.
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Concatenates all text carried by this content.
    ///
    /// Non-text blocks are skipped.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text(b) => Some(b.text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ContentBlock>> for Content {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote it.
    pub role: Role,
    /// What was said.
    pub content: Content,
}

impl Message {
    /// Creates a message.
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a `user` message.
    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an `assistant` message.
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a `system` message.
    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }
}
