//! Request and reply bodies as they travel over HTTP.

use crate::types::{ContentBlock, Message, Response, StopReason, Tool, ToolChoice, Usage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct Body<'a> {
    pub model: &'a str,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'a ToolChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Reply {
    id: String,
    model: String,
    content: Vec<ReplyBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplyBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Ignored,
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        let content = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ReplyBlock::Text { text } => Some(ContentBlock::Text { text }),
                ReplyBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ReplyBlock::Ignored => None,
            })
            .collect();

        Response {
            id: reply.id,
            model: reply.model,
            content,
            stop_reason: StopReason::parse(reply.stop_reason.as_deref()),
            usage: reply.usage,
        }
    }
}
