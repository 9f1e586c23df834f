//! Provider client tests against a local fake of the Google endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose, Engine};
use sign_bridge::core::config::ProviderConfig;
use sign_bridge::services::translation::api_client::build_http_client;
use sign_bridge::services::translation::{GoogleTranslateClient, GoogleTtsClient};
use sign_bridge::{
    SpeechSynthesizer, TranslateRequest, TranslationBridge, TranslationError, Translator,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Calls = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn fake_translate(
    State(calls): State<Calls>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    calls.lock().unwrap().push(params.clone());

    let q = params.get("q").cloned().unwrap_or_default();
    let tl = params.get("tl").cloned().unwrap_or_default();
    if tl == "xx" {
        return (StatusCode::BAD_REQUEST, "bad language").into_response();
    }

    Json(serde_json::json!([
        [[format!("[{}] {}", tl, q), q, null, null, 10]],
        null,
        "en"
    ]))
    .into_response()
}

async fn fake_tts(
    State(calls): State<Calls>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    calls.lock().unwrap().push(params.clone());

    match params.get("tl").map(String::as_str) {
        Some("zz") => (StatusCode::INTERNAL_SERVER_ERROR, "synthesis unavailable").into_response(),
        Some("empty") => Vec::<u8>::new().into_response(),
        _ => format!("<{}:{}>", params["idx"], params["q"]).into_response(),
    }
}

struct FakeGoogle {
    base: String,
    translate_calls: Calls,
    tts_calls: Calls,
}

impl FakeGoogle {
    async fn start() -> Self {
        let translate_calls = Calls::default();
        let tts_calls = Calls::default();

        let app = Router::new()
            .route(
                "/translate_a/single",
                get(fake_translate).with_state(translate_calls.clone()),
            )
            .route(
                "/translate_tts",
                get(fake_tts).with_state(tts_calls.clone()),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            translate_calls,
            tts_calls,
        }
    }

    fn config(&self) -> ProviderConfig {
        ProviderConfig {
            translate_url: format!("{}/translate_a/single", self.base),
            tts_url: format!("{}/translate_tts", self.base),
            timeout_seconds: 5,
        }
    }

    fn translator(&self) -> GoogleTranslateClient {
        let config = self.config();
        GoogleTranslateClient::new(build_http_client(&config).unwrap(), config.translate_url)
    }

    fn synthesizer(&self) -> GoogleTtsClient {
        let config = self.config();
        GoogleTtsClient::new(build_http_client(&config).unwrap(), config.tts_url)
    }
}

#[tokio::test]
async fn test_translate_sends_expected_query() {
    let google = FakeGoogle::start().await;

    let translated = google.translator().translate("good morning", "hi").await.unwrap();
    assert_eq!(translated, "[hi] good morning");

    let calls = google.translate_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["client"], "gtx");
    assert_eq!(calls[0]["sl"], "auto");
    assert_eq!(calls[0]["tl"], "hi");
    assert_eq!(calls[0]["dt"], "t");
    assert_eq!(calls[0]["q"], "good morning");
}

#[tokio::test]
async fn test_translate_provider_status_is_reported() {
    let google = FakeGoogle::start().await;

    let err = google.translator().translate("hello", "xx").await.unwrap_err();
    match err {
        TranslationError::ProviderStatus {
            provider,
            status,
            body,
        } => {
            assert_eq!(provider, "translate");
            assert_eq!(status, 400);
            assert_eq!(body, "bad language");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_translate_unreachable_provider_is_request_failure() {
    let config = ProviderConfig {
        translate_url: "http://127.0.0.1:9/translate_a/single".to_string(),
        tts_url: "http://127.0.0.1:9/translate_tts".to_string(),
        timeout_seconds: 2,
    };
    let client = GoogleTranslateClient::new(build_http_client(&config).unwrap(), config.translate_url);

    let err = client.translate("hello", "es").await.unwrap_err();
    assert!(matches!(err, TranslationError::RequestFailed { provider: "translate", .. }));
}

#[tokio::test]
async fn test_speech_single_chunk() {
    let google = FakeGoogle::start().await;

    let audio = google.synthesizer().synthesize("Hola mundo", "es").await.unwrap();
    assert_eq!(audio, b"<0:Hola mundo>");

    let calls = google.tts_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["client"], "tw-ob");
    assert_eq!(calls[0]["ie"], "UTF-8");
    assert_eq!(calls[0]["tl"], "es");
    assert_eq!(calls[0]["total"], "1");
    assert_eq!(calls[0]["idx"], "0");
    assert_eq!(calls[0]["textlen"], "10");
}

#[tokio::test]
async fn test_speech_long_text_is_chunked_and_concatenated() {
    let google = FakeGoogle::start().await;
    let first = format!("{}.", "a".repeat(79));
    let second = "b".repeat(90);
    let text = format!("{} {}", first, second);

    let audio = google.synthesizer().synthesize(&text, "en").await.unwrap();
    assert_eq!(
        String::from_utf8(audio).unwrap(),
        format!("<0:{}><1:{}>", first, second)
    );

    let calls = google.tts_calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c["total"] == "2"));
    assert!(calls.iter().all(|c| c["q"].chars().count() <= 100));
}

#[tokio::test]
async fn test_speech_provider_status_is_reported() {
    let google = FakeGoogle::start().await;

    let err = google.synthesizer().synthesize("hello", "zz").await.unwrap_err();
    assert!(matches!(
        err,
        TranslationError::ProviderStatus { provider: "tts", status: 500, .. }
    ));
}

#[tokio::test]
async fn test_speech_empty_audio_is_invalid() {
    let google = FakeGoogle::start().await;

    let err = google.synthesizer().synthesize("hello", "empty").await.unwrap_err();
    assert!(matches!(err, TranslationError::InvalidResponse { provider: "tts", .. }));
}

#[tokio::test]
async fn test_speech_blank_text_makes_no_request() {
    let google = FakeGoogle::start().await;

    let err = google.synthesizer().synthesize("   ", "es").await.unwrap_err();
    assert!(matches!(err, TranslationError::NothingToSpeak));
    assert!(google.tts_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bridge_speaks_the_translation() {
    let google = FakeGoogle::start().await;
    let bridge = TranslationBridge::from_config(&google.config()).unwrap();

    let result = bridge
        .translate_and_speak(TranslateRequest {
            text: Some("thank you".to_string()),
            language: Some("ta".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(result.translated_text, "[ta] thank you");
    let payload = result
        .audio_url
        .strip_prefix("data:audio/mp3;base64,")
        .unwrap();
    let audio = general_purpose::STANDARD.decode(payload).unwrap();
    assert_eq!(audio, b"<0:[ta] thank you>");

    // Speech is requested in the target language, for the translated text
    let tts_calls = google.tts_calls.lock().unwrap();
    assert_eq!(tts_calls[0]["tl"], "ta");
    assert_eq!(tts_calls[0]["q"], "[ta] thank you");
}
