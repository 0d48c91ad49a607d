//! Blocking client for Ollama's native `/api/chat` endpoint.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::sys::llm::{Content, GenerationError, GenerationOptions, Generator, Role};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "mattw/llama2-13b-tiefighter";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

fn request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::RequestFailed(e.to_string())
    }
}

impl Generator for OllamaClient {
    fn chat(
        &self,
        messages: &[Content],
        options: GenerationOptions,
    ) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|c| ChatMessage {
                    role: c.role,
                    content: &c.message,
                })
                .collect(),
            stream: false,
            options: ChatOptions {
                temperature: options.temperature,
                seed: options.seed,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().map_err(request_error)?;

        if !status.is_success() {
            return Err(GenerationError::Unavailable {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(response.message.content)
    }
}

// Wire types

#[derive(Debug, serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, serde::Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct ChatOptions {
    temperature: f32,
    seed: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseMessage {
    content: String,
}
