//! HTTP client for the remote model compiler.

use diffeq_config::CompilerConfig;
use diffeq_core::{CompileService, DiffeqError, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct CompileRequest<'a> {
    text: &'a str,
    name: &'a str,
}

/// Posts model source to `<base_url>/compile` and returns the binary.
///
/// A 2xx response body is the compiled module. Any other status is a
/// compiler diagnostic: the body text, or the status line when the body is
/// empty. The client does not retry.
#[derive(Debug, Clone)]
pub struct HttpCompileService {
    client: reqwest::Client,
    url: String,
    model_name: String,
}

impl HttpCompileService {
    /// # Errors
    ///
    /// `Transport` if the HTTP client cannot be constructed.
    pub fn new(config: &CompilerConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DiffeqError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.compile_url(),
            model_name: config.model_name.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CompileService for HttpCompileService {
    async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        tracing::debug!(
            event = "compile_request",
            url = %self.url,
            bytes = source.len()
        );

        let response = self
            .client
            .post(&self.url)
            .json(&CompileRequest {
                text: source,
                name: &self.model_name,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(transport)?;
            let detail = if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(DiffeqError::Compilation(detail));
        }

        let binary = response.bytes().await.map_err(transport)?;
        Ok(binary.to_vec())
    }
}

fn transport(err: reqwest::Error) -> DiffeqError {
    DiffeqError::Transport(err.to_string())
}
