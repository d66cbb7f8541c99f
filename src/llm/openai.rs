//! `OpenAI` Responses API provider

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderError, ProviderKind, classify_status};

/// `OpenAI` text and vision completions via `/responses`
pub struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, prompt: &str, image: Option<&str>) -> Result<String, ProviderError> {
        let input = match image {
            Some(image_url) => Input::Messages(vec![InputMessage {
                role: "user",
                content: vec![
                    InputContent::InputText {
                        text: prompt.to_string(),
                    },
                    InputContent::InputImage {
                        image_url: image_url.to_string(),
                    },
                ],
            }]),
            None => Input::Text(prompt.to_string()),
        };
        let request = ResponsesRequest {
            model: &self.model,
            input,
        };

        tracing::debug!(model = %self.model, with_image = image.is_some(), "sending OpenAI request");

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let result: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Failed(format!("failed to parse response: {e}")))?;

        result
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Failed("empty response from model".to_string()))
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Input,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Input {
    Text(String),
    Messages(Vec<InputMessage>),
}

#[derive(Serialize)]
struct InputMessage {
    role: &'static str,
    content: Vec<InputContent>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputContent {
    InputText { text: String },
    InputImage { image_url: String },
}

#[derive(Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    fn text(self) -> Option<String> {
        self.output_text.filter(|t| !t.trim().is_empty()).or_else(|| {
            self.output
                .into_iter()
                .flat_map(|item| item.content)
                .find_map(|c| c.text)
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(
            Client::new(),
            SecretString::from("sk-test"),
            "gpt-5-mini",
            &server.uri(),
        )
    }

    #[tokio::test]
    async fn text_request_reads_output_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-5-mini", "input": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output": [
                    {"type": "reasoning", "summary": []},
                    {"type": "message", "content": [{"type": "output_text", "text": "  Captain Salah. "}]}
                ]
            })))
            .mount(&server)
            .await;

        let reply = provider(&server).complete("hello", None).await.unwrap();
        assert_eq!(reply, "Captain Salah.");
    }

    #[tokio::test]
    async fn image_request_uses_structured_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(body_partial_json(serde_json::json!({
                "input": [{"role": "user", "content": [
                    {"type": "input_text", "text": "rate my team"},
                    {"type": "input_image", "image_url": "data:image/jpeg;base64,AAAA"}
                ]}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"output_text": "Solid squad."})),
            )
            .mount(&server)
            .await;

        let reply = provider(&server)
            .complete("rate my team", Some("data:image/jpeg;base64,AAAA"))
            .await
            .unwrap();
        assert_eq!(reply, "Solid squad.");
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hi", None).await.unwrap_err();
        assert_eq!(err, ProviderError::InvalidCredentials);
    }

    #[tokio::test]
    async fn empty_reply_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"output": []})))
            .mount(&server)
            .await;

        let err = provider(&server).complete("hi", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Failed(_)));
    }
}
