use crate::domain::ports::TokenProvider;
use crate::utils::error::{MigrationError, Result};
use async_trait::async_trait;

/// 固定的 bearer token，例如 `az account get-access-token` 的輸出
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(MigrationError::PlatformAuth {
                message: "access token is empty".to_string(),
            });
        }
        Ok(Self { token })
    }
}

// Never print the token itself.
impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
