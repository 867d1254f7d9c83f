//! Text generation capability and its Ollama backend.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Debug, Error)]
pub enum GenerateError {
    /// The service could not be reached or failed on its side. Worth retrying.
    #[error("generation service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something unusable. Not retried.
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerateError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerateError::Unavailable(_))
    }
}

/// Something that turns a prompt into markdown text.
pub trait TextGenerator {
    /// Cheap "is it up" probe.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> impl Future<Output = std::result::Result<String, GenerateError>> + Send;
}

/// Client for a local or networked Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            base_url: normalize_host(host),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TextGenerator for OllamaClient {
    async fn is_available(&self) -> bool {
        match self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("Ollama at {} answered the probe with {}", self.base_url, resp.status());
                false
            }
            Err(e) => {
                warn!("Could not connect to Ollama at {}: {e}", self.base_url);
                false
            }
        }
    }

    async fn generate(&self, model: &str, prompt: &str) -> std::result::Result<String, GenerateError> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct Resp {
            response: String,
        }

        let body = Req {
            model,
            prompt,
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            let msg = format!("ollama error: {status} {txt}");
            return Err(if status.is_server_error() {
                GenerateError::Unavailable(msg)
            } else {
                GenerateError::Malformed(msg)
            });
        }

        let out: Resp = resp
            .json()
            .await
            .map_err(|e| GenerateError::Malformed(format!("parse ollama response: {e}")))?;
        Ok(out.response.trim().to_string())
    }
}

/// Accept `OLLAMA_HOST` forms like `localhost:11434` or `http://host:11434/`.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return DEFAULT_OLLAMA_HOST.to_string();
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_host("https://ollama.lan/"), "https://ollama.lan");
        assert_eq!(normalize_host("  "), DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(GenerateError::Unavailable("down".into()).is_retryable());
        assert!(!GenerateError::Malformed("junk".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) on localhost is closed on any sane test box.
        let client = OllamaClient::new("127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(!client.is_available().await);
        let err = client.generate("llama2", "hi").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
