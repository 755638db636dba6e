//! OpenAI-compatible function-calling source.
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::source::{CapabilityError, ConstraintSource};

const SYSTEM_PROMPT: &str = "You extract grocery basket constraints from a user request. \
Always call parse_basket_query. Use English tag keys.";

const TOOL_NAME: &str = "parse_basket_query";

/// Connection settings for [`HttpLlmSource`]
#[derive(Debug, Clone)]
pub struct HttpLlmConfig {
    /// Full chat-completions URL
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

pub struct HttpLlmSource {
    client: reqwest::Client,
    config: HttpLlmConfig,
}

impl HttpLlmSource {
    pub fn new(config: HttpLlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// JSON schema of the `parse_basket_query` tool
    pub fn tool_definition() -> Value {
        json!({
            "type": "function",
            "function": {
                "name": TOOL_NAME,
                "description": "Extract budget, party size, meal types and product tag constraints from a grocery request.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "budget_rub": { "type": ["number", "null"], "description": "Budget in rubles, null when not stated" },
                        "people": { "type": ["integer", "null"], "description": "Number of people, null when not stated" },
                        "meal_types": {
                            "type": "array",
                            "items": { "type": "string", "enum": ["breakfast", "lunch", "dinner", "snack"] }
                        },
                        "exclude_tags": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Tags to exclude: dairy, meat, fish, gluten, sugar, alcohol, nuts"
                        },
                        "include_tags": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Tags every product must have: vegan, vegetarian, halal, children_goods"
                        },
                        "prefer_quick": { "type": "boolean" }
                    },
                    "required": []
                }
            }
        })
    }

    fn request_body(&self, query: &str) -> Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": query }
            ],
            "tools": [Self::tool_definition()],
            "tool_choice": { "type": "function", "function": { "name": TOOL_NAME } }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Pull the tool-call arguments out of a chat-completions response.
fn tool_arguments(body: &str) -> Result<Value, CapabilityError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| CapabilityError::Serialization(e.to_string()))?;

    let call = response
        .choices
        .into_iter()
        .flat_map(|c| c.message.tool_calls)
        .find(|t| t.function.name == TOOL_NAME)
        .ok_or_else(|| CapabilityError::Response(format!("no {} tool call in response", TOOL_NAME)))?;

    serde_json::from_str(&call.function.arguments)
        .map_err(|e| CapabilityError::Serialization(format!("tool arguments: {}", e)))
}

#[async_trait]
impl ConstraintSource for HttpLlmSource {
    fn name(&self) -> &'static str {
        "http_llm"
    }

    async fn extract(&self, query: &str) -> Result<Value, CapabilityError> {
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(query));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CapabilityError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CapabilityError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(CapabilityError::Http(format!("status {}: {}", status, body)));
        }

        debug!(model = %self.config.model, "llm tool call received");
        tool_arguments(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_arguments_extracted() {
        let body = r#"{
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {
                            "name": "parse_basket_query",
                            "arguments": "{\"budget_rub\": 1500, \"people\": 2, \"exclude_tags\": [\"dairy\"]}"
                        }
                    }]
                }
            }]
        }"#;
        let args = tool_arguments(body).unwrap();
        assert_eq!(args["budget_rub"], 1500);
        assert_eq!(args["people"], 2);
    }

    #[test]
    fn test_missing_tool_call() {
        let body = r#"{ "choices": [{ "message": { "content": "hello" } }] }"#;
        assert!(matches!(tool_arguments(body), Err(CapabilityError::Response(_))));
    }

    #[test]
    fn test_request_body_forces_tool() {
        let source = HttpLlmSource::new(HttpLlmConfig {
            endpoint: "http://localhost/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        });
        let body = source.request_body("ужин");
        assert_eq!(body["tool_choice"]["function"]["name"], TOOL_NAME);
        assert_eq!(body["messages"][1]["content"], "ужин");
    }
}
