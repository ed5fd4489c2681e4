use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub policies: Vec<String>,
    /// Lease duration in the credential service's own notation, e.g. `60m`
    pub lease: String,
}

/// Issues short-lived secrets. No retry is expected from callers.
#[async_trait::async_trait]
pub trait CredentialService: Send + Sync {
    async fn issue_token(&self, request: &TokenRequest) -> Result<String>;
    fn name(&self) -> String;
}
