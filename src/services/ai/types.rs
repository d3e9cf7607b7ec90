use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

/// Body of a Bedrock `InvokeModel` call for Anthropic models
#[derive(Debug, Serialize)]
pub struct InvokeRequest<'a> {
    pub anthropic_version: &'a str,
    pub messages: Vec<RequestMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct RequestMessage<'a> {
    pub role: &'a str,
    pub content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RequestBlock<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub text: &'a str,
}

impl<'a> InvokeRequest<'a> {
    pub fn user_prompt(prompt: &'a str, max_tokens: u32, temperature: f32) -> Self {
        Self {
            anthropic_version: ANTHROPIC_BEDROCK_VERSION,
            messages: vec![RequestMessage {
                role: "user",
                content: vec![RequestBlock {
                    kind: "text",
                    text: prompt,
                }],
            }],
            max_tokens,
            temperature,
        }
    }
}

/// One content block, kept as raw JSON so an unexpected block cannot
/// invalidate the rest of the message
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ResponseBlock(pub Value);

impl ResponseBlock {
    /// The block's text when it is a `text` block
    pub fn text(&self) -> Option<&str> {
        if self.0.get("type").and_then(Value::as_str) != Some("text") {
            return None;
        }
        Some(self.0.get("text").and_then(Value::as_str).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputEnvelope {
    pub message: OutputMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputMessage {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
}

/// The payload shapes a generation call can return. Variants are tried in
/// declaration order, so `{output: {message}}` wins over a top-level
/// `content` array, and anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GenerationResponse {
    OutputMessage { output: OutputEnvelope },
    Content { content: Vec<ResponseBlock> },
    Unrecognized(Value),
}

fn join_text(blocks: &[ResponseBlock]) -> String {
    blocks
        .iter()
        .filter_map(ResponseBlock::text)
        .collect()
}

impl GenerationResponse {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Unrecognized(value))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Answer text: text blocks concatenated in order, or the pretty-printed
    /// payload when the shape is unknown
    pub fn into_text(self) -> String {
        match self {
            Self::OutputMessage { output } => join_text(&output.message.content),
            Self::Content { content } => join_text(&content),
            Self::Unrecognized(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}
