//! Configuration for dreamloom.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DREAMLOOM_OUTPUT_DIR, OLLAMA_URL, SD_URL)
//! 2. Config file (.dreamloom/config.yaml)
//! 3. Defaults (~/.dreamloom/outputs, local backend servers)
//!
//! Config file discovery:
//! - Searches current directory and parents for .dreamloom/config.yaml
//! - A relative output_dir in the file is resolved against the config file's
//!   project root

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub text_model: Option<TextModelSection>,
    #[serde(default)]
    pub image_model: Option<ImageModelSection>,
    #[serde(default)]
    pub pipeline: Option<PipelineSection>,
    /// Models the front door offers for selection
    #[serde(default)]
    pub available_text_models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextModelSection {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub options: Option<TextModelOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageModelSection {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub parameters: Option<ImageModelParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    pub target_words: Option<u32>,
    pub scenes: Option<usize>,
    pub style_hint: Option<String>,
    pub output_dir: Option<String>,
    pub compress_scenes: Option<bool>,
}

/// Sampling options forwarded to the text backend on every call.
#[derive(Debug, Clone, Deserialize)]
pub struct TextModelOptions {
    /// Context window size; a story plus its prompt needs a large one
    #[serde(default = "default_num_ctx")]
    pub num_ctx: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_num_ctx() -> u32 {
    32_000
}
fn default_temperature() -> f32 {
    0.8
}
fn default_top_p() -> f32 {
    0.9
}

impl Default for TextModelOptions {
    fn default() -> Self {
        Self {
            num_ctx: default_num_ctx(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// Rendering parameters forwarded to the image backend on every call.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageModelParams {
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default = "default_negative_prompt")]
    pub negative_prompt: String,
}

fn default_steps() -> u32 {
    30
}
fn default_guidance_scale() -> f32 {
    6.5
}
fn default_width() -> u32 {
    768
}
fn default_height() -> u32 {
    512
}
fn default_seed() -> i64 {
    42
}
fn default_negative_prompt() -> String {
    "scary, horror, gore, photorealistic, harsh shadows, text overlay".to_string()
}

impl Default for ImageModelParams {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            guidance_scale: default_guidance_scale(),
            width: default_width(),
            height: default_height(),
            seed: default_seed(),
            negative_prompt: default_negative_prompt(),
        }
    }
}

/// Pipeline shape: how much story, how many scenes, where output goes.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub target_words: u32,
    /// Upper bound on illustrated scenes per run
    pub scenes: usize,
    pub style_hint: String,
    /// Absolute output root; each run owns a subdirectory of it
    pub output_dir: PathBuf,
    /// Compress each scene through the text backend before prompt building
    pub compress_scenes: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_words: 500,
            scenes: 4,
            style_hint: "gentle, whimsical, storybook illustration".to_string(),
            output_dir: default_output_dir(),
            compress_scenes: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dreamloom")
        .join("outputs")
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_sd_url() -> String {
    "http://localhost:7860".to_string()
}

fn default_available_models() -> Vec<String> {
    [
        "dolphin3",
        "gemma3:4b",
        "llama3.1",
        "mistral",
        "openchat",
        "phi3:14b",
        "qwen3",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Resolved text model configuration.
#[derive(Debug, Clone)]
pub struct TextModelConfig {
    /// Default model name (front-door requests may pick another)
    pub name: String,
    /// Base URL of the Ollama server
    pub url: String,
    pub options: TextModelOptions,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            name: "llama3.1".to_string(),
            url: default_ollama_url(),
            options: TextModelOptions::default(),
        }
    }
}

/// Resolved image model configuration.
#[derive(Debug, Clone)]
pub struct ImageModelConfig {
    pub name: String,
    /// Base URL of the Stable Diffusion server
    pub url: String,
    pub parameters: ImageModelParams,
}

impl Default for ImageModelConfig {
    fn default() -> Self {
        Self {
            name: "sdxl".to_string(),
            url: default_sd_url(),
            parameters: ImageModelParams::default(),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub text_model: TextModelConfig,
    pub image_model: ImageModelConfig,
    pub pipeline: PipelineSettings,
    pub available_text_models: Vec<String>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_model: TextModelConfig::default(),
            image_model: ImageModelConfig::default(),
            pipeline: PipelineSettings::default(),
            available_text_models: default_available_models(),
            config_file: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();

        let mut config = match config_file {
            Some(ref path) => {
                let file = load_config_file(path)?;
                Self::from_file(file, path)
            }
            None => Self::default(),
        };
        config.config_file = config_file;

        // Environment overrides beat the file.
        if let Ok(dir) = std::env::var("DREAMLOOM_OUTPUT_DIR") {
            config.pipeline.output_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            config.text_model.url = url;
        }
        if let Ok(url) = std::env::var("SD_URL") {
            config.image_model.url = url;
        }

        Ok(config)
    }

    /// Merge a parsed config file over the defaults.
    fn from_file(file: ConfigFile, config_path: &Path) -> Self {
        let mut config = Self::default();

        if let Some(text) = file.text_model {
            if let Some(name) = text.name {
                config.text_model.name = name;
            }
            if let Some(url) = text.url {
                config.text_model.url = url;
            }
            if let Some(options) = text.options {
                config.text_model.options = options;
            }
        }

        if let Some(image) = file.image_model {
            if let Some(name) = image.name {
                config.image_model.name = name;
            }
            if let Some(url) = image.url {
                config.image_model.url = url;
            }
            if let Some(parameters) = image.parameters {
                config.image_model.parameters = parameters;
            }
        }

        if let Some(pipeline) = file.pipeline {
            if let Some(words) = pipeline.target_words {
                config.pipeline.target_words = words;
            }
            if let Some(scenes) = pipeline.scenes {
                config.pipeline.scenes = scenes;
            }
            if let Some(hint) = pipeline.style_hint {
                config.pipeline.style_hint = hint;
            }
            if let Some(compress) = pipeline.compress_scenes {
                config.pipeline.compress_scenes = compress;
            }
            if let Some(dir) = pipeline.output_dir {
                // Relative to the project root (parent of .dreamloom/)
                let base = config_path
                    .parent()
                    .and_then(|p| p.parent())
                    .unwrap_or(Path::new("."));
                config.pipeline.output_dir = resolve_path(base, &dir);
            }
        }

        if !file.available_text_models.is_empty() {
            config.available_text_models = file.available_text_models;
        }

        config
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".dreamloom").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path_str)
    }
}
