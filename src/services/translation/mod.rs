pub mod api_client;
pub mod bridge;
pub mod speech;
pub mod translator;

pub use bridge::{audio_data_uri, TranslationBridge, AUDIO_DATA_URI_PREFIX};
pub use speech::{GoogleTtsClient, SpeechSynthesizer};
pub use translator::{GoogleTranslateClient, Translator};
