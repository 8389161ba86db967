//! Client for a Gemini-style `generateContent` endpoint.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::TranslateError;
use super::batch;
use crate::config::TranslatorConfig;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Generative-AI translation provider.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    /// Create a client for the configured model.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| TranslateError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("brewhouse-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_url.as_str().trim_end_matches('/'),
            config.model
        );

        Ok(Self { client, endpoint })
    }

    /// Translate one batch.
    ///
    /// Returns `Ok(None)` when the provider answered but the reply is not a
    /// JSON array of the right length.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the provider answers with a
    /// non-success status.
    #[instrument(skip(self, target, texts), fields(target_lang = %target, count = texts.len()))]
    pub async fn translate_batch(
        &self,
        target: &str,
        texts: &[&str],
    ) -> Result<Option<Vec<String>>, TranslateError> {
        let prompt = batch::prompt(target, texts);
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json",
            },
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let Ok(reply) = response.json::<GenerateResponse>().await else {
            return Ok(None);
        };
        Ok(reply
            .text()
            .and_then(|text| batch::parse_reply(&text, texts.len())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use url::Url;

    use super::*;

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(&TranslatorConfig {
            api_url: Url::parse("https://generativelanguage.googleapis.com/v1beta/").unwrap(),
            api_key: SecretString::from("k3y-Xy9-ab12CD34ef56"),
            model: "gemini-2.0-flash".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                response_mime_type: "application/json",
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": { "temperature": 0.5, "responseMimeType": "application/json" }
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "[\"a\"," }, { "text": "\"b\"]" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.text().is_none());
    }
}
