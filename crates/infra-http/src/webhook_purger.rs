// Webhook Cache Purger
// POSTs to a configured URL; any 2xx counts as purged

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;
use transcache_core::error::{AppError, Result};
use transcache_core::port::CachePurger;

pub struct WebhookPurger {
    http: reqwest::Client,
    name: String,
    url: String,
    token: Option<String>,
}

impl WebhookPurger {
    pub fn new(name: impl Into<String>, url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::Config(format!("Cannot build purge client: {}", e)))?;

        Ok(Self {
            http,
            name: name.into(),
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl CachePurger for WebhookPurger {
    fn name(&self) -> &str {
        &self.name
    }

    async fn purge_all(&self) -> Result<()> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({"action": "purge_all"}));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Purge webhook unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Internal(format!(
                "Purge webhook returned HTTP {}",
                status.as_u16()
            )));
        }

        info!(purger = %self.name, "Page cache purged");
        Ok(())
    }
}
