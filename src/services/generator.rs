//! Text-generation collaborator adapters for the fill-in phase.
//!
//! The collaborator is a black box: it receives a serialized `FillInRequest`
//! and returns raw text, which the coordinator parses tolerantly.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

use crate::config::TextGeneratorConfig;
use crate::services::fill_in::FillInRequest;
use crate::BeatframeError;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a raw response for the request.
    async fn generate(&self, request: &FillInRequest) -> Result<String, BeatframeError>;

    fn name(&self) -> &str;
}

/// Generator that is never available. Every fill-in falls back to defaults.
pub struct NoopTextGenerator;

#[async_trait]
impl TextGenerator for NoopTextGenerator {
    async fn generate(&self, _request: &FillInRequest) -> Result<String, BeatframeError> {
        Err(BeatframeError::FillIn(
            "no text generator configured".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Runs an external command: request JSON on stdin, response on stdout.
pub struct CommandTextGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandTextGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Generator for a config section; `None` when no command is set.
    pub fn from_config(config: &TextGeneratorConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Self::new(c, config.args.clone()))
    }
}

#[async_trait]
impl TextGenerator for CommandTextGenerator {
    async fn generate(&self, request: &FillInRequest) -> Result<String, BeatframeError> {
        let payload = serde_json::to_vec(request)?;

        // kill_on_drop so a timed-out call does not leave the process behind
        let mut child = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BeatframeError::FillIn(format!("text generator '{}' not found", self.command))
                } else {
                    BeatframeError::FillIn(format!(
                        "failed to spawn text generator '{}': {}",
                        self.command, e
                    ))
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| {
                BeatframeError::FillIn(format!("failed to write to text generator: {}", e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            BeatframeError::FillIn(format!("failed to wait for text generator: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BeatframeError::FillIn(format!(
                "text generator exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn name(&self) -> &str {
        &self.command
    }
}
