//! Blocking HTTP client for a local Ollama server.
//!
//! One client serves both model roles: vision OCR over `/api/chat`
//! with base64 page images, and summarization over `/api/generate`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Cannot reach model server at {0}")]
    Connection(String),

    #[error("Model server request timed out after {0}s")]
    Timeout(u64),

    #[error("Model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Unexpected model server response: {0}")]
    ResponseParsing(String),
}

/// Text generation (summarization side).
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, OllamaError>;
}

/// Chat with attached images (OCR side).
pub trait VisionClient: Send + Sync {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images_base64: &[String],
        system: Option<&str>,
    ) -> Result<String, OllamaError>;
}

pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Build a client with a per-request timeout.
    ///
    /// Must not be called from inside an async task: the blocking client
    /// spins up its own runtime.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OllamaError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, OllamaError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).json(body).send().map_err(|e| {
            if e.is_connect() {
                OllamaError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                OllamaError::Timeout(self.timeout_secs)
            } else {
                OllamaError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OllamaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| OllamaError::ResponseParsing(e.to_string()))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, OllamaError> {
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };
        let parsed: GenerateResponse = self.post("/api/generate", &body)?;
        Ok(parsed.response)
    }
}

impl VisionClient for OllamaClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images_base64: &[String],
        system: Option<&str>,
    ) -> Result<String, OllamaError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
                images: None,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
            images: Some(images_base64),
        });

        let body = ChatRequest {
            model,
            messages,
            stream: false,
        };
        let parsed: ChatResponse = self.post("/api/chat", &body)?;
        Ok(parsed.message.content)
    }
}
