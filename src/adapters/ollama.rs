//! Ollama adapter for text generation.
//!
//! Talks to an Ollama server over its REST API (`/api/generate`,
//! non-streaming). Transport and API failures surface as typed
//! [`BackendError`]s; an error is never folded into the generated text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TextBackend;
use crate::config::TextModelOptions;
use crate::error::BackendError;

/// Text backend speaking the Ollama generate API
pub struct OllamaClient {
    /// Model to request (e.g. "llama3.1")
    model_name: String,
    /// Server base URL without trailing slash
    server_url: String,
    options: TextModelOptions,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_ctx: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaClient {
    /// Create a client for one model on one server.
    pub fn new(
        model_name: impl Into<String>,
        server_url: impl Into<String>,
        options: TextModelOptions,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            server_url: trim_base_url(server_url.into()),
            options,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path)
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl TextBackend for OllamaClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_ctx: self.options.num_ctx,
                temperature: self.options.temperature,
                top_p: self.options.top_p,
            },
        };

        let response = self
            .client
            .post(self.api_url("api/generate"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = response.json().await?;

        if let Some(error) = parsed.error {
            return Err(BackendError::Api(error));
        }

        Ok(parsed.response)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        // Listing installed models doubles as a reachability probe.
        self.client
            .get(self.api_url("api/tags"))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
