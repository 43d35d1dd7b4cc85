//! Artifact store: the fitted scaler and regression model.
//!
//! Both artifacts are produced by the training pipeline and read once at
//! startup. They are JSON documents carrying the fitted parameters plus the
//! column names they were fit on; a mismatch with `FEATURE_COLUMNS` is
//! rejected here rather than producing silently wrong predictions later.
//!
//! Request handlers only see the `InferenceBackend` trait, so tests can
//! substitute a double for the real store.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::model::{
    ArtifactError, FeatureRow, PredictError, ScaledRow, FEATURE_COLUMNS, FEATURE_COUNT,
};

// ============================================================================
// Inference Contract
// ============================================================================

/// Two-step inference used by the prediction handler.
pub trait InferenceBackend: Send + Sync {
    /// Applies the fitted scaling transform, column-wise.
    fn transform(&self, row: &FeatureRow) -> Result<ScaledRow, PredictError>;

    /// Produces a single numeric estimate from a scaled row.
    fn predict(&self, row: &ScaledRow) -> Result<f64, PredictError>;
}

// ============================================================================
// Artifact Documents
// ============================================================================

/// Scaler artifact as written by the training pipeline.
#[derive(Debug, Deserialize)]
struct ScalerDocument {
    feature_names: Vec<String>,
    #[serde(default)]
    mean: Option<Vec<f64>>,
    #[serde(default)]
    scale: Option<Vec<f64>>,
}

/// Regression model artifact as written by the training pipeline.
#[derive(Debug, Deserialize)]
struct ModelDocument {
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

// ============================================================================
// Fitted Objects
// ============================================================================

/// Standardization with stored per-column mean and scale.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    /// `None` disables centering.
    mean: Option<[f64; FEATURE_COUNT]>,
    /// `None` disables scaling. Zero entries are already replaced by 1.
    scale: Option<[f64; FEATURE_COUNT]>,
}

impl StandardScaler {
    pub fn new(mean: Option<[f64; FEATURE_COUNT]>, scale: Option<[f64; FEATURE_COUNT]>) -> Self {
        // A constant column was fit with zero variance; leave it unscaled.
        let scale = scale.map(|s| s.map(|v| if v == 0.0 { 1.0 } else { v }));
        Self { mean, scale }
    }

    pub fn transform(&self, row: &FeatureRow) -> Result<ScaledRow, PredictError> {
        let mut values = row.to_array();
        for (j, value) in values.iter_mut().enumerate() {
            if !value.is_finite() {
                return Err(PredictError::Inference(format!(
                    "input column {} is not a finite number",
                    FEATURE_COLUMNS[j]
                )));
            }
            if let Some(mean) = &self.mean {
                *value -= mean[j];
            }
            if let Some(scale) = &self.scale {
                *value /= scale[j];
            }
        }
        Ok(ScaledRow(values))
    }
}

/// Ordinary linear regression: `intercept + coefficients · x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
}

impl LinearModel {
    pub fn new(coefficients: [f64; FEATURE_COUNT], intercept: f64) -> Self {
        Self { coefficients, intercept }
    }

    pub fn predict(&self, row: &ScaledRow) -> Result<f64, PredictError> {
        let estimate = self
            .coefficients
            .iter()
            .zip(row.0.iter())
            .fold(self.intercept, |acc, (c, x)| acc + c * x);

        if !estimate.is_finite() {
            return Err(PredictError::Inference(
                "model produced a non-finite estimate".to_string(),
            ));
        }
        Ok(estimate)
    }
}

// ============================================================================
// Artifact Store
// ============================================================================

/// The loaded scaler and model. Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactStore {
    scaler: StandardScaler,
    model: LinearModel,
}

impl ArtifactStore {
    pub fn new(scaler: StandardScaler, model: LinearModel) -> Self {
        Self { scaler, model }
    }

    /// Reads and validates both artifacts.
    ///
    /// # Errors
    /// Returns the first problem found in the model file, then the scaler
    /// file. Nothing is returned half-loaded.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        let model = load_model(model_path)?;
        let scaler = load_scaler(scaler_path)?;
        Ok(Self { scaler, model })
    }
}

impl InferenceBackend for ArtifactStore {
    fn transform(&self, row: &FeatureRow) -> Result<ScaledRow, PredictError> {
        self.scaler.transform(row)
    }

    fn predict(&self, row: &ScaledRow) -> Result<f64, PredictError> {
        self.model.predict(row)
    }
}

// ============================================================================
// Loading
// ============================================================================

fn read_document<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ArtifactError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ArtifactError::Missing(display));
    }
    let text = fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: display.clone(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ArtifactError::Corrupt {
        path: display,
        message: e.to_string(),
    })
}

fn check_feature_names(path: &Path, names: &[String]) -> Result<(), ArtifactError> {
    let matches = names.len() == FEATURE_COUNT
        && names.iter().zip(FEATURE_COLUMNS.iter()).all(|(a, b)| a == b);
    if matches {
        Ok(())
    } else {
        Err(ArtifactError::FeatureMismatch {
            path: path.display().to_string(),
            found: names.to_vec(),
        })
    }
}

fn to_columns(
    path: &Path,
    field: &'static str,
    values: Vec<f64>,
) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    let found = values.len();
    let columns: [f64; FEATURE_COUNT] =
        values.try_into().map_err(|_| ArtifactError::ShapeMismatch {
            path: path.display().to_string(),
            field,
            expected: FEATURE_COUNT,
            found,
        })?;
    if columns.iter().any(|v| !v.is_finite()) {
        return Err(ArtifactError::NonFinite {
            path: path.display().to_string(),
            field,
        });
    }
    Ok(columns)
}

/// Loads and validates a scaler artifact.
pub fn load_scaler(path: &Path) -> Result<StandardScaler, ArtifactError> {
    let doc: ScalerDocument = read_document(path)?;
    check_feature_names(path, &doc.feature_names)?;

    let mean = doc.mean.map(|m| to_columns(path, "mean", m)).transpose()?;
    let scale = doc.scale.map(|s| to_columns(path, "scale", s)).transpose()?;
    Ok(StandardScaler::new(mean, scale))
}

/// Loads and validates a regression model artifact.
pub fn load_model(path: &Path) -> Result<LinearModel, ArtifactError> {
    let doc: ModelDocument = read_document(path)?;
    check_feature_names(path, &doc.feature_names)?;

    let coefficients = to_columns(path, "coefficients", doc.coefficients)?;
    if !doc.intercept.is_finite() {
        return Err(ArtifactError::NonFinite {
            path: path.display().to_string(),
            field: "intercept",
        });
    }
    Ok(LinearModel::new(coefficients, doc.intercept))
}

// ============================================================================
// Tests
// ============================================================================
