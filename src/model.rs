/// Core data types for the energy bill prediction service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond small accessors, no I/O, and no external
/// dependencies other than serde for the response shape.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Feature columns
// ---------------------------------------------------------------------------

/// Number of columns the scaler and model were fit on.
pub const FEATURE_COUNT: usize = 6;

/// Column names in the exact order the scaler and model were fit on.
///
/// Reordering these silently produces wrong predictions, so both artifacts
/// carry their own copy of the names and are rejected at load time if they
/// disagree with this list.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "home_size",
    "num_appliances",
    "temp_degree_days",
    "temp_cdd",
    "temp_hdd",
    "month_periods",
];

// ---------------------------------------------------------------------------
// Weather types
// ---------------------------------------------------------------------------

/// Seasonal degree-day statistics for one month key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherStats {
    pub temp_degree_days: f64,
    pub temp_cdd: f64, // cooling-degree-days
    pub temp_hdd: f64, // heating-degree-days
}

// ---------------------------------------------------------------------------
// Feature types
// ---------------------------------------------------------------------------

/// One row of raw model inputs, named by column.
///
/// `month_periods` is always the month exactly as the caller sent it, never
/// the wrapped weather key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub home_size: f64,
    pub num_appliances: f64,
    pub temp_degree_days: f64,
    pub temp_cdd: f64,
    pub temp_hdd: f64,
    pub month_periods: f64,
}

impl FeatureRow {
    /// Values in `FEATURE_COLUMNS` order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.home_size,
            self.num_appliances,
            self.temp_degree_days,
            self.temp_cdd,
            self.temp_hdd,
            self.month_periods,
        ]
    }
}

/// A feature row after the fitted scaling transform, in `FEATURE_COLUMNS` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledRow(pub [f64; FEATURE_COUNT]);

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// JSON body returned by `POST /predict`.
///
/// Success: `{"success": true, "predicted_bill": 123.4}`
/// Failure: `{"success": false, "error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_bill: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn success(predicted_bill: f64) -> Self {
        Self {
            success: true,
            predicted_bill: Some(predicted_bill),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            predicted_bill: None,
            error: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while loading the scaler and model artifacts at startup.
///
/// Every variant names the file it came from. Any of these is fatal: the
/// service never starts serving with a partial artifact set.
#[derive(Debug, PartialEq)]
pub enum ArtifactError {
    /// The artifact file does not exist.
    Missing(String),
    /// The file exists but could not be read.
    Io { path: String, message: String },
    /// The file is not a well-formed artifact document.
    Corrupt { path: String, message: String },
    /// A parameter vector has the wrong number of columns.
    ShapeMismatch { path: String, field: &'static str, expected: usize, found: usize },
    /// The artifact was fit on different columns, or in a different order.
    FeatureMismatch { path: String, found: Vec<String> },
    /// A fitted parameter is NaN or infinite.
    NonFinite { path: String, field: &'static str },
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactError::Missing(path) => write!(f, "Artifact not found: {}", path),
            ArtifactError::Io { path, message } => {
                write!(f, "Failed to read artifact {}: {}", path, message)
            }
            ArtifactError::Corrupt { path, message } => {
                write!(f, "Corrupt artifact {}: {}", path, message)
            }
            ArtifactError::ShapeMismatch { path, field, expected, found } => write!(
                f,
                "Artifact {}: `{}` has {} values, expected {}",
                path, field, found, expected
            ),
            ArtifactError::FeatureMismatch { path, found } => write!(
                f,
                "Artifact {} was fit on columns [{}], expected [{}]",
                path,
                found.join(", "),
                FEATURE_COLUMNS.join(", ")
            ),
            ArtifactError::NonFinite { path, field } => {
                write!(f, "Artifact {}: `{}` contains a non-finite value", path, field)
            }
        }
    }
}

impl std::error::Error for ArtifactError {}

/// Errors that can arise while handling a single prediction request.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictError {
    /// The body is not a JSON object.
    InvalidBody(String),
    /// A required field is absent.
    MissingField(&'static str),
    /// A numeric field holds something that is not a number.
    InvalidField { field: &'static str, message: String },
    /// `month` cannot be coerced to an integer.
    InvalidMonth(String),
    /// The scaler or model rejected the row.
    Inference(String),
}

impl PredictError {
    /// True for caller mistakes, false for scaler/model failures.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, PredictError::Inference(_))
    }
}

impl std::fmt::Display for PredictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
            PredictError::MissingField(field) => write!(f, "Missing required field: {}", field),
            PredictError::InvalidField { field, message } => {
                write!(f, "Invalid value for {}: {}", field, message)
            }
            PredictError::InvalidMonth(msg) => write!(f, "Invalid month: {}", msg),
            PredictError::Inference(msg) => write!(f, "Inference failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictError {}

/// Errors raised while reading the service configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Io { path: String, message: String },
    Parse { path: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read config {}: {}", path, message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Invalid config {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Anything that stops the service before it accepts traffic.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Artifacts(ArtifactError),
    /// Binding or serving the listener failed.
    Io(std::io::Error),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "{}", e),
            StartupError::Artifacts(e) => write!(f, "{}", e),
            StartupError::Io(e) => write!(f, "Listener error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        StartupError::Config(e)
    }
}

impl From<ArtifactError> for StartupError {
    fn from(e: ArtifactError) -> Self {
        StartupError::Artifacts(e)
    }
}

impl From<std::io::Error> for StartupError {
    fn from(e: std::io::Error) -> Self {
        StartupError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
