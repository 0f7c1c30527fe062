use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use tracing::debug;

/// Resolves an opaque secret reference into the secret value.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<String>;
}

/// Reads secrets through the 1Password CLI (`op read <reference>`).
/// The binary can be overridden by the `OP_BIN` env var.
pub struct OnePasswordCli {
    program: String,
}

impl OnePasswordCli {
    pub fn new() -> Self {
        Self {
            program: env::var("OP_BIN").unwrap_or_else(|_| "op".into()),
        }
    }
}

impl Default for OnePasswordCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretResolver for OnePasswordCli {
    async fn resolve(&self, reference: &str) -> Result<String> {
        debug!("resolving secret reference {}", reference);
        let output = tokio::process::Command::new(&self.program)
            .arg("read")
            .arg(reference)
            .output()
            .await
            .with_context(|| format!("running `{} read`", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "`{} read {}` failed ({}): {}. Make sure you're signed in to the 1Password CLI",
                self.program,
                reference,
                output.status,
                stderr.trim()
            ));
        }
        let value = String::from_utf8(output.stdout)
            .map_err(|e| anyhow!("secret for {} is not UTF-8: {}", reference, e))?
            .trim()
            .to_string();
        if value.is_empty() {
            return Err(anyhow!("secret for {} is empty", reference));
        }
        Ok(value)
    }
}

/// Fixed reference -> value table.
#[derive(Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, value: &str) -> Self {
        self.values.insert(reference.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SecretResolver for StaticSecrets {
    async fn resolve(&self, reference: &str) -> Result<String> {
        self.values
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow!("unknown secret reference {}", reference))
    }
}

/// OAuth client identity and optional API key, resolved from config references.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub api_key: Option<String>,
}

pub async fn resolve_credentials(
    resolver: &dyn SecretResolver,
    refs: &crate::config::SecretRefs,
) -> Result<ResolvedCredentials> {
    let client_id = resolver
        .resolve(&refs.oauth_client_id)
        .await
        .context("resolving OAuth client id")?;
    let client_secret = resolver
        .resolve(&refs.oauth_client_secret)
        .await
        .context("resolving OAuth client secret")?;
    let api_key = match &refs.api_key {
        Some(r) => Some(resolver.resolve(r).await.context("resolving API key")?),
        None => None,
    };
    Ok(ResolvedCredentials {
        client_id,
        client_secret,
        api_key,
    })
}
