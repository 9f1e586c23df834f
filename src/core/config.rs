use crate::core::errors::{ConfigError, ConfigResult};
use std::env;
use std::str::FromStr;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
    pub max_upload_bytes: usize,
}

/// ONNX execution provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceBackend {
    Auto,
    Cpu,
    Cuda,
    TensorRt,
    CoreMl,
    DirectMl,
    OpenVino,
}

impl FromStr for InferenceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "tensorrt" => Ok(Self::TensorRt),
            "coreml" => Ok(Self::CoreMl),
            "directml" => Ok(Self::DirectMl),
            "openvino" => Ok(Self::OpenVino),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Location of one detection model and its optional labels override
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub model_path: String,
    pub labels_path: Option<String>,
}

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub american: ModelSource,
    pub indian: ModelSource,
    pub iou_threshold: f32,
    pub target_size: u32,
    pub max_detections: usize,
    pub inference_backend: InferenceBackend,
    /// Number of ONNX sessions per model
    pub pool_size: usize,
}

/// Translation and speech provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub translate_url: String,
    pub tts_url: String,
    pub timeout_seconds: u64,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub providers: ProviderConfig,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    pub fn new() -> ConfigResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> ConfigResult<Self> {
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::DEBUG);

        let inference_backend = env::var("INFERENCE_BACKEND")
            .map(|s| s.parse())
            .unwrap_or(Ok(InferenceBackend::Auto))?;

        Ok(Self {
            server: ServerConfig {
                port: parse_env("SERVER_PORT", 5000),
                host: optional_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                log_level,
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 16 * 1024 * 1024),
            },
            detection: DetectionConfig {
                american: ModelSource {
                    model_path: optional_env("AMERICAN_MODEL_PATH")
                        .unwrap_or_else(|| "models/best.onnx".to_string()),
                    labels_path: optional_env("AMERICAN_LABELS_PATH"),
                },
                indian: ModelSource {
                    model_path: optional_env("INDIAN_MODEL_PATH")
                        .unwrap_or_else(|| "models/isl_best.onnx".to_string()),
                    labels_path: optional_env("INDIAN_LABELS_PATH"),
                },
                iou_threshold: parse_env("IOU_THRESHOLD", 0.7),
                target_size: parse_env("TARGET_SIZE", 640),
                max_detections: parse_env("MAX_DETECTIONS", 300),
                inference_backend,
                pool_size: parse_env("ONNX_POOL_SIZE", default_pool_size()),
            },
            providers: ProviderConfig {
                translate_url: optional_env("TRANSLATE_API_URL").unwrap_or_else(|| {
                    "https://translate.googleapis.com/translate_a/single".to_string()
                }),
                tts_url: optional_env("TTS_API_URL")
                    .unwrap_or_else(|| "https://translate.google.com/translate_tts".to_string()),
                timeout_seconds: parse_env("PROVIDER_TIMEOUT_SECONDS", 30),
            },
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.detection.iou_threshold) {
            return Err(ConfigError::InvalidIoUThreshold(self.detection.iou_threshold));
        }

        let size = self.detection.target_size;
        if !(32..=2048).contains(&size) || size % 32 != 0 {
            return Err(ConfigError::InvalidTargetSize(size));
        }

        if self.detection.max_detections == 0 {
            return Err(ConfigError::MustBePositive { name: "MAX_DETECTIONS" });
        }
        if self.detection.pool_size == 0 {
            return Err(ConfigError::MustBePositive { name: "ONNX_POOL_SIZE" });
        }
        if self.providers.timeout_seconds == 0 {
            return Err(ConfigError::MustBePositive { name: "PROVIDER_TIMEOUT_SECONDS" });
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::MustBePositive { name: "MAX_UPLOAD_BYTES" });
        }

        for (name, value) in [
            ("TRANSLATE_API_URL", &self.providers.translate_url),
            ("TTS_API_URL", &self.providers.tts_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    name,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }
}

fn default_pool_size() -> usize {
    std::cmp::max(num_cpus::get() / 2, 2)
}
