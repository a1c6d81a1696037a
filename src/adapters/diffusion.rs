//! Stable Diffusion adapter for image generation.
//!
//! Talks to an SD-WebUI-compatible server (`/sdapi/v1/txt2img`). The server
//! returns base64-encoded PNGs; this adapter decodes them so the rest of the
//! pipeline only ever sees bytes.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::ImageBackend;
use crate::config::ImageModelParams;
use crate::error::BackendError;

/// Image backend speaking the SD-WebUI txt2img API
pub struct DiffusionClient {
    /// Registry-facing model name (e.g. "sdxl")
    model_name: String,
    /// Server base URL without trailing slash
    server_url: String,
    params: ImageModelParams,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    steps: u32,
    cfg_scale: f32,
    width: u32,
    height: u32,
    seed: i64,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

impl DiffusionClient {
    /// Create a client for one model on one server.
    pub fn new(
        model_name: impl Into<String>,
        server_url: impl Into<String>,
        params: ImageModelParams,
    ) -> Self {
        let server_url: String = server_url.into();
        Self {
            model_name: model_name.into(),
            server_url: server_url.trim_end_matches('/').to_string(),
            params,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path)
    }
}

#[async_trait]
impl ImageBackend for DiffusionClient {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(
        &self,
        prompt: &str,
        steps: u32,
        guidance_scale: f32,
    ) -> Result<Vec<u8>, BackendError> {
        let body = Txt2ImgRequest {
            prompt,
            negative_prompt: &self.params.negative_prompt,
            steps,
            cfg_scale: guidance_scale,
            width: self.params.width,
            height: self.params.height,
            seed: self.params.seed,
        };

        let response = self
            .client
            .post(self.api_url("sdapi/v1/txt2img"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: Txt2ImgResponse = response.json().await?;

        let first = parsed
            .images
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Api("backend returned no images".to_string()))?;

        BASE64
            .decode(first.as_bytes())
            .map_err(|e| BackendError::Decode(format!("invalid base64 image payload: {}", e)))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        self.client
            .get(self.api_url("sdapi/v1/sd-models"))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
