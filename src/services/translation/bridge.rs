use anyhow::Result;
use base64::{engine::general_purpose, Engine};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::core::config::ProviderConfig;
use crate::core::errors::TranslationError;
use crate::core::types::{TranslateRequest, TranslationResult};
use crate::services::translation::api_client::build_http_client;
use crate::services::translation::speech::{GoogleTtsClient, SpeechSynthesizer};
use crate::services::translation::translator::{GoogleTranslateClient, Translator};

/// Prefix of every `audio_url` returned to clients
pub const AUDIO_DATA_URI_PREFIX: &str = "data:audio/mp3;base64,";

/// Wrap MP3 bytes in a data URI usable directly as a playback source
pub fn audio_data_uri(audio: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(audio);
    let mut uri = String::with_capacity(AUDIO_DATA_URI_PREFIX.len() + encoded.len());
    uri.push_str(AUDIO_DATA_URI_PREFIX);
    uri.push_str(&encoded);
    uri
}

/// Translates text, then speaks the translation in the same language.
/// Everything stays in memory.
pub struct TranslationBridge {
    translator: Arc<dyn Translator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl TranslationBridge {
    pub fn new(translator: Arc<dyn Translator>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            translator,
            synthesizer,
        }
    }

    /// Bridge backed by the Google translation and TTS endpoints in `config`
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let http_client = build_http_client(config)?;
        info!(
            "Providers: translate={} tts={} (timeout {}s)",
            config.translate_url, config.tts_url, config.timeout_seconds
        );

        Ok(Self::new(
            Arc::new(GoogleTranslateClient::new(http_client.clone(), &config.translate_url)),
            Arc::new(GoogleTtsClient::new(http_client, &config.tts_url)),
        ))
    }

    pub async fn translate_and_speak(
        &self,
        request: TranslateRequest,
    ) -> Result<TranslationResult, TranslationError> {
        let (text, language) = match (request.text, request.language) {
            (Some(text), Some(language)) if !text.is_empty() && !language.is_empty() => {
                (text, language)
            }
            _ => return Err(TranslationError::MissingFields),
        };

        let start = Instant::now();
        let translated_text = self.translator.translate(&text, &language).await?;
        let audio = self.synthesizer.synthesize(&translated_text, &language).await?;

        debug!(
            "Translation to {} done in {:.2}ms ({} audio bytes)",
            language,
            start.elapsed().as_secs_f64() * 1000.0,
            audio.len()
        );

        Ok(TranslationResult {
            translated_text,
            audio_url: audio_data_uri(&audio),
        })
    }
}
