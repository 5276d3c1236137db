//! Welcome text generation over an OpenAI-compatible chat completion API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompletionError;
use crate::settings::WelcomeSettings;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// What the model is told about the newcomer.
#[derive(Debug, Clone)]
pub struct JoinContext {
    pub guild_name: String,
    pub member_count: u64,
    pub display_name: String,
}

impl JoinContext {
    fn prompt(&self) -> String {
        format!(
            "Server: {}\nMember count: {}\nNew member: {}",
            self.guild_name, self.member_count, self.display_name
        )
    }
}

/// Thin client for the `/chat/completions` endpoint.
#[derive(Clone)]
pub struct WelcomeWriter {
    client: reqwest::Client,
}

impl WelcomeWriter {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Ask the model for a greeting.
    pub async fn write(
        &self,
        settings: &WelcomeSettings,
        join: &JoinContext,
    ) -> Result<String, CompletionError> {
        let prompt = join.prompt();
        let body = request(settings, &prompt);
        let url = endpoint(settings.base_url.as_deref());
        debug!("Requesting welcome text from {} ({})", url, settings.model);

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = settings.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        let res = req.send().await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let parsed: ChatResponse = res.json().await?;
        first_text(parsed)
    }
}

impl Default for WelcomeWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn endpoint(base_url: Option<&str>) -> String {
    let base = base_url
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_API_BASE);
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

fn request<'a>(settings: &'a WelcomeSettings, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model: &settings.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &settings.system_prompt,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    }
}

fn first_text(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
        .ok_or(CompletionError::Empty)
}
