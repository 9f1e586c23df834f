use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::errors::TranslationError;
use crate::services::translation::api_client::send_checked;

const PROVIDER: &str = "tts";

/// The TTS endpoint rejects longer inputs
pub const MAX_CHUNK_CHARS: usize = 100;

const SENTENCE_BREAKS: &[char] = &[
    '.', '!', '?', ';', ':', ',', '¿', '¡', '。', '！', '？', '、', '，', '।', '\n',
];

/// Speech synthesis provider producing MP3 audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, TranslationError>;
}

/// Client for the Google Translate TTS endpoint (`translate_tts`)
pub struct GoogleTtsClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl GoogleTtsClient {
    pub fn new(http_client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, TranslationError> {
        let chunks = split_for_speech(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(TranslationError::NothingToSpeak);
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let request = self.http_client.get(&self.endpoint).query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk.as_str()),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ]);

            let bytes = send_checked(PROVIDER, request)
                .await?
                .bytes()
                .await
                .map_err(|source| TranslationError::RequestFailed {
                    provider: PROVIDER,
                    source,
                })?;

            if bytes.is_empty() {
                return Err(TranslationError::InvalidResponse {
                    provider: PROVIDER,
                    reason: format!("empty audio for chunk {}", idx),
                });
            }
            audio.extend_from_slice(&bytes);
        }

        debug!("Synthesized {} bytes of audio in {} chunk(s)", audio.len(), chunks.len());
        Ok(audio)
    }
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Cuts after the last sentence break inside the window, else at the last
/// whitespace, else hard at `max_chars`. Pieces are trimmed and empty
/// pieces dropped.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut rest = chars.as_slice();
    let mut chunks = Vec::new();

    loop {
        while let Some((first, tail)) = rest.split_first() {
            if !first.is_whitespace() {
                break;
            }
            rest = tail;
        }
        if rest.is_empty() {
            break;
        }

        let cut = if rest.len() <= max_chars {
            rest.len()
        } else {
            let window = &rest[..max_chars];
            window
                .iter()
                .rposition(|c| SENTENCE_BREAKS.contains(c))
                .map(|i| i + 1)
                .or_else(|| window.iter().rposition(|c| c.is_whitespace()).filter(|&i| i > 0))
                .unwrap_or(max_chars)
        };

        let chunk: String = rest[..cut].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = &rest[cut..];
    }

    chunks
}
