use reqwest;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::models::transcript::ChatMessage;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// One chat completion round trip. The whole transcript is sent as-is.
pub async fn query_openai(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<String, BackendError> {
    let request = OpenAIRequest {
        model,
        messages,
        temperature,
    };

    let response = client
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| BackendError::model(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::model(e.to_string()))?;

    if !status.is_success() {
        return Err(BackendError::model(format!(
            "Request failed with status {}: {}",
            status, text
        )));
    }

    let parsed: OpenAIResponse = serde_json::from_str(&text).map_err(|e| {
        BackendError::model(format!("Failed to parse JSON: {}\nRaw body: {}", e, text))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| BackendError::model("No response from OpenAI"))
}
