//! Chat Completions client for any OpenAI-compatible endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{AskRequest, ModelClient, ModelTurn, ToolDefinition};
use crate::config::ModelSettings;
use crate::error::{Result, TetherError};
use crate::types::{Message, Role, ToolCall};
use crate::util::retry::RetryPolicy;

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f64>,
    retry: RetryPolicy,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature: None,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let mut client = Self::new(
            settings.base_url.clone(),
            settings.api_key.clone(),
            settings.model.clone(),
        )?;
        client.temperature = settings.temperature;
        Ok(client)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    fn build_body(&self, request: &AskRequest, tools: &[ToolDefinition]) -> Value {
        let messages: Vec<Value> = request
            .system
            .iter()
            .chain(request.messages.iter())
            .map(message_to_openai)
            .collect();

        let mut body = json!({
            "model": request.model.as_deref().unwrap_or(&self.model),
            "messages": messages,
        });
        let Some(obj) = body.as_object_mut() else {
            return body;
        };
        if let Some(temperature) = request.temperature.or(self.temperature) {
            obj.insert("temperature".into(), json!(temperature));
        }
        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), Value::Array(tools));
            obj.insert("tool_choice".into(), json!("auto"));
        }
        body
    }

    async fn complete(&self, body: &Value) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %body["model"], "chat completion request");

        self.retry
            .run("chat_completion", || async {
                let resp = self
                    .http
                    .post(&url)
                    .headers(self.headers())
                    .json(body)
                    .send()
                    .await?;

                let status = resp.status();
                if !status.is_success() {
                    let message = resp.text().await.unwrap_or_default();
                    return Err(TetherError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }

                let data: ChatResponse = resp.json().await?;
                data.choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message)
                    .ok_or_else(|| TetherError::Model("No choices in completion response".into()))
            })
            .await
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatibleClient {
    async fn ask(&self, request: AskRequest) -> Result<Option<String>> {
        let body = self.build_body(&request, &[]);
        let message = self.complete(&body).await?;
        Ok(message.content.filter(|content| !content.is_empty()))
    }

    async fn ask_tool(&self, request: AskRequest, tools: &[ToolDefinition]) -> Result<ModelTurn> {
        let body = self.build_body(&request, tools);
        let message = self.complete(&body).await?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments)),
            })
            .collect();

        Ok(ModelTurn {
            content: message.content.filter(|content| !content.is_empty()),
            tool_calls,
        })
    }
}

fn message_to_openai(message: &Message) -> Value {
    match message.role {
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                Value::String(message.content.clone())
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        role => match &message.image {
            Some(image) => json!({
                "role": role.to_string(),
                "content": [
                    { "type": "text", "text": message.content },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:{};base64,{}", image.mime_type, image.data) }
                    }
                ]
            }),
            None => json!({ "role": role.to_string(), "content": message.content }),
        },
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    arguments: String,
}
