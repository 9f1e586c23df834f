// HTTP surface: liveness, sign detection and translation routes

use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::core::errors::ApiError;
use crate::core::types::{AppState, DetectionRecord, TranslateRequest, TranslationResult};
use crate::services::detection::ModelKind;
use crate::utils::image_ops::decode_frame;

pub const LIVENESS_MESSAGE: &str = "Sign bridge backend is running! 🚀";

/// Build the router with CORS open to every origin
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/detect", post(detect))
        .route("/translate", post(translate).options(translate_preflight))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(translate_options_body))
}

async fn root() -> (StatusCode, &'static str) {
    (StatusCode::OK, LIVENESS_MESSAGE)
}

/// Run sign detection on one uploaded frame
///
/// # Request Format:
/// - multipart/form-data
/// - Field "frame": the image (any format the decoder recognises)
/// - Field "modelType" (optional): "american" (default) or "indian"
///
/// # Response:
/// - JSON array of `{x1, y1, x2, y2, label, confidence}`
async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<DetectionRecord>>, ApiError> {
    let result = match multipart {
        Ok(multipart) => run_detection(state, multipart).await,
        Err(rejection) => Err(ApiError::internal(rejection.body_text())),
    };

    result.map(Json).map_err(|e| {
        error!("Error during detection: {}", e.message);
        e
    })
}

async fn run_detection(
    state: AppState,
    mut multipart: Multipart,
) -> Result<Vec<DetectionRecord>, ApiError> {
    let mut frame: Option<Bytes> = None;
    let mut model_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "frame" => {
                frame = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::internal(format!("Read error: {}", e)))?,
                );
            }
            "modelType" => {
                model_type = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::internal(format!("Read error: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    let frame = frame.ok_or_else(|| ApiError::internal("Missing 'frame' field"))?;
    debug!("Received frame of size: {} bytes", frame.len());

    let kind = ModelKind::from_key(model_type.as_deref());
    let detector = state.registry.select(kind);
    let start = Instant::now();

    let detections = tokio::task::spawn_blocking(move || match decode_frame(&frame) {
        Some(image) => detector.detect(&image),
        None => Ok(Vec::new()),
    })
    .await
    .map_err(|e| ApiError::internal(format!("Inference task failed: {}", e)))??;

    debug!(
        "Detections ({} model, {:.2}ms): {:?}",
        kind,
        start.elapsed().as_secs_f64() * 1000.0,
        detections
    );

    Ok(detections)
}

/// Translate text and return it with inline speech audio
///
/// The body is read raw so that malformed JSON is reported with the same
/// `{"error": ...}` shape as every other failure.
async fn translate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranslationResult>, ApiError> {
    let result = async {
        let request: TranslateRequest = serde_json::from_slice(&body)
            .map_err(|e| ApiError::internal(format!("Invalid JSON body: {}", e)))?;
        Ok::<_, ApiError>(state.bridge.translate_and_speak(request).await?)
    }
    .await;

    match result {
        Ok(result) => {
            info!("Translated {} chars", result.translated_text.chars().count());
            Ok(Json(result))
        }
        Err(e) => {
            if e.status.is_server_error() {
                error!("Error during translation: {}", e.message);
            }
            Err(e)
        }
    }
}

async fn translate_preflight() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

/// CORS preflights never reach `translate_preflight`: the CORS layer answers
/// them with an empty body. Give every successful `OPTIONS /translate` the
/// same `{}` body, keeping the CORS headers.
async fn translate_options_body(request: Request, next: Next) -> Response {
    let is_translate_options =
        request.method() == Method::OPTIONS && request.uri().path() == "/translate";
    let response = next.run(request).await;

    if !is_translate_options || !response.status().is_success() {
        return response;
    }

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from("{}"))
}
