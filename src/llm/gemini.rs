//! Gemini `generateContent` provider

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderError, ProviderKind, classify_status};

/// Google Gemini text and vision completions
pub struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    #[must_use]
    pub fn new(client: Client, api_key: SecretString, model: impl Into<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Split a data URL into MIME type and base64 payload without decoding
fn inline_image(data_url: &str) -> Option<InlineData> {
    let rest = data_url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.split(';').next().filter(|m| !m.is_empty())?;
    Some(InlineData {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, prompt: &str, image: Option<&str>) -> Result<String, ProviderError> {
        let mut parts = vec![Part::Text {
            text: prompt.to_string(),
        }];
        if let Some(url) = image {
            let inline = inline_image(url)
                .ok_or_else(|| ProviderError::Failed("image is not a base64 data URL".to_string()))?;
            parts.push(Part::InlineData { inline_data: inline });
        }
        let request = GenerateRequest {
            contents: vec![Content { parts }],
        };

        tracing::debug!(model = %self.model, with_image = image.is_some(), "sending Gemini request");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Failed(format!("failed to parse response: {e}")))?;

        result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Failed("received an unexpected or empty response".to_string()))
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(
            Client::new(),
            SecretString::from("AIza-test"),
            "gemini-2.0-flash",
            &server.uri(),
        )
    }

    #[test]
    fn splits_data_url() {
        let inline = inline_image("data:image/png;base64,iVBORw0").unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "iVBORw0");
        assert!(inline_image("not a data url").is_none());
    }

    #[tokio::test]
    async fn sends_text_and_inline_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"parts": [
                    {"text": "who is this?"},
                    {"inline_data": {"mime_type": "image/jpeg", "data": "AAAA"}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "That is Palmer.\n"}]}}]
            })))
            .mount(&server)
            .await;

        let reply = provider(&server)
            .complete("who is this?", Some("data:image/jpeg;base64,AAAA"))
            .await
            .unwrap();
        assert_eq!(reply, "That is Palmer.");
    }

    #[tokio::test]
    async fn invalid_key_body_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.",
                          "details": [{"reason": "API_KEY_INVALID"}]}
            })))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hi", None).await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidCredentials);
    }

    #[tokio::test]
    async fn blocked_reply_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]})),
            )
            .mount(&server)
            .await;

        let err = provider(&server).complete("hi", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Failed(_)));
    }
}
