use async_trait::async_trait;

use crate::clients::openai_client;
use crate::error::BackendError;
use crate::models::transcript::ChatMessage;

/// Which model configuration a call runs on. `Upgraded` is only ever used
/// for the first turn of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Default,
    Upgraded,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tier: ModelTier,
        temperature: f32,
    ) -> Result<String, BackendError>;
}

pub struct OpenAIService {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
    upgraded_model: String,
}

impl OpenAIService {
    pub fn new(api_key: String, default_model: String, upgraded_model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: openai_client::DEFAULT_BASE_URL.to_string(),
            default_model,
            upgraded_model,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Default => &self.default_model,
            ModelTier::Upgraded => &self.upgraded_model,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIService {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tier: ModelTier,
        temperature: f32,
    ) -> Result<String, BackendError> {
        openai_client::query_openai(
            &self.http,
            &self.base_url,
            &self.api_key,
            self.model_for(tier),
            messages,
            temperature,
        )
        .await
    }
}
