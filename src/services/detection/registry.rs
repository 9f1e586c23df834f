use std::fmt;
use std::sync::Arc;

use crate::core::config::DetectionConfig;
use crate::core::errors::DetectionResult;
use crate::services::detection::yolo::YoloDetector;
use crate::services::detection::Detector;

/// Which of the two loaded models a request runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    /// American Sign Language
    #[default]
    American,
    /// Indian Sign Language
    Indian,
}

impl ModelKind {
    /// Parse the `modelType` form field. Only `"indian"` selects the
    /// Indian model; anything else, including no value, means American.
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("indian") => Self::Indian,
            _ => Self::American,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::American => "american",
            Self::Indian => "indian",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two detection models, loaded once at startup and shared read-only
pub struct ModelRegistry {
    american: Arc<dyn Detector>,
    indian: Arc<dyn Detector>,
}

impl ModelRegistry {
    pub fn new(american: Arc<dyn Detector>, indian: Arc<dyn Detector>) -> Self {
        Self { american, indian }
    }

    /// Load both YOLO models described by `config`
    pub fn load(config: &DetectionConfig) -> DetectionResult<Self> {
        let american = YoloDetector::load(ModelKind::American.as_str(), &config.american, config)?;
        let indian = YoloDetector::load(ModelKind::Indian.as_str(), &config.indian, config)?;
        Ok(Self::new(Arc::new(american), Arc::new(indian)))
    }

    pub fn select(&self, kind: ModelKind) -> Arc<dyn Detector> {
        match kind {
            ModelKind::American => Arc::clone(&self.american),
            ModelKind::Indian => Arc::clone(&self.indian),
        }
    }
}
