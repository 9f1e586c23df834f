use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::errors::TranslationError;
use crate::services::translation::api_client::send_checked;

const PROVIDER: &str = "translate";

/// Text translation provider
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language` (a provider language code
    /// such as `es`). The source language is detected by the provider.
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslationError>;
}

/// Client for the Google Translate web endpoint (`translate_a/single`)
pub struct GoogleTranslateClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateClient {
    pub fn new(http_client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslationError> {
        let request = self.http_client.get(&self.endpoint).query(&[
            ("client", "gtx"),
            ("sl", "auto"),
            ("tl", target_language),
            ("dt", "t"),
            ("q", text),
        ]);

        let body: serde_json::Value = send_checked(PROVIDER, request)
            .await?
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse {
                provider: PROVIDER,
                reason: e.to_string(),
            })?;

        let translated = parse_translation(&body)?;
        debug!("Translated to {}: {}", target_language, translated);
        Ok(translated)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The body is a nested array whose first element lists segments as
/// `[translated, original, ...]`.
pub fn parse_translation(body: &serde_json::Value) -> Result<String, TranslationError> {
    let segments = body
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslationError::InvalidResponse {
            provider: PROVIDER,
            reason: "missing translation segments".to_string(),
        })?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_segment() {
        let body = json!([[["Hola", "hello", null, null, 10]], null, "en"]);
        assert_eq!(parse_translation(&body).unwrap(), "Hola");
    }

    #[test]
    fn test_parse_joins_segments() {
        let body = json!([
            [
                ["Hola. ", "Hello. ", null, null, 10],
                ["¿Cómo estás?", "How are you?", null, null, 10],
                [null, null, "Hello. How are you?"]
            ],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "Hola. ¿Cómo estás?");
    }

    #[test]
    fn test_parse_rejects_unexpected_body() {
        assert!(matches!(
            parse_translation(&json!({"error": "bad"})),
            Err(TranslationError::InvalidResponse { .. })
        ));
        assert!(parse_translation(&json!([null])).is_err());
    }
}
