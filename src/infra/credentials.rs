use crate::app::ports::CredentialProvider;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;

/// Reads the bearer token from an environment variable on every call, so a
/// rotated token is picked up by the next run without a restart.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvTokenProvider {
    async fn token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(PipelineError::MissingCredential(format!(
                "environment variable {} is not set",
                self.var
            ))),
        }
    }
}

pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(PipelineError::MissingCredential("empty token".to_string()));
        }
        Ok(self.token.clone())
    }
}
