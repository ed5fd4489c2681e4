//! Credential service backed by the Vault token API.
//!
//! Nodes receive a short lived child token in their userdata which they use
//! once on first boot to get their SSH host keys signed.

use std::{path::Path, time::Duration};

use anyhow::{anyhow, bail, Result};
use common::credential::{CredentialService, TokenRequest};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

const TOKEN_ENV: &str = "VAULT_TOKEN";
const TOKEN_FILE: &str = ".vault-token";

pub struct Vault {
    address: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateToken<'a> {
    policies: &'a [String],
    ttl: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    auth: Auth,
}

#[derive(Debug, Deserialize)]
struct Auth {
    client_token: String,
}

impl Vault {
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            address: address.into(),
            token: token.into(),
            client,
        })
    }

    /// Uses the caller token from `VAULT_TOKEN`, falling back to the file the
    /// vault CLI writes on login.
    pub async fn from_env(address: impl Into<String>) -> Result<Self> {
        let token = match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => token,
            _ => {
                let home = home::home_dir().ok_or_else(|| anyhow!("home directory not found"))?;
                read_token_file(home.join(TOKEN_FILE)).await?
            }
        };
        Self::new(address, token)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn token_url(&self) -> String {
        format!("{}/v1/auth/token/create", self.address.trim_end_matches('/'))
    }
}

async fn read_token_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let token = fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("no {TOKEN_ENV} set and {} unreadable: {e}", path.display()))?;
    let token = token.trim();
    if token.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(token.to_owned())
}

fn parse_response(body: &str) -> Result<String> {
    let response: CreateTokenResponse = serde_json::from_str(body)?;
    Ok(response.auth.client_token)
}

#[async_trait::async_trait]
impl CredentialService for Vault {
    async fn issue_token(&self, request: &TokenRequest) -> Result<String> {
        let url = self.token_url();
        debug!("requesting token from {url}");

        let response = self
            .client
            .post(&url)
            .header("X-Vault-Token", &self.token)
            .json(&CreateToken {
                policies: &request.policies,
                ttl: &request.lease,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            bail!("token request to {url} failed with HTTP {status}: {body}");
        }

        let token = parse_response(&body)?;
        info!(
            "issued token with policies {:?} for {}",
            request.policies, request.lease
        );
        Ok(token)
    }

    fn name(&self) -> String {
        "vault".to_owned()
    }
}
