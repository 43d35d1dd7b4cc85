//! Prediction service: one request in, one response out.
//!
//! Parses the caller's home attributes and month, resolves the seasonal
//! weather inputs, assembles the feature row in training column order and
//! runs it through an `InferenceBackend`. Every failure comes back as a
//! `PredictError` value and is turned into the uniform failure body at the
//! boundary in `handle_predict`.

use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::artifacts::InferenceBackend;
use crate::model::{FeatureRow, PredictError, PredictionResponse};
use crate::weather;

// ============================================================================
// Request
// ============================================================================

/// Validated inputs of one prediction request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRequest {
    pub home_size: f64,
    pub num_appliances: f64,
    /// Exactly as sent, before any weather wraparound.
    pub month: i64,
}

impl PredictionRequest {
    /// Parses a raw request body. Only `home_size`, `num_appliances` and
    /// `month` are read; any other keys are ignored.
    pub fn from_body(body: &[u8]) -> Result<Self, PredictError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| PredictError::InvalidBody(e.to_string()))?;
        match value {
            Value::Object(fields) => Self::from_fields(&fields),
            _ => Err(PredictError::InvalidBody(
                "expected a JSON object".to_string(),
            )),
        }
    }

    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, PredictError> {
        let home_size = coerce_number("home_size", required(fields, "home_size")?)?;
        let num_appliances = coerce_number("num_appliances", required(fields, "num_appliances")?)?;
        let month = coerce_month(required(fields, "month")?)?;
        Ok(Self {
            home_size,
            num_appliances,
            month,
        })
    }
}

fn required<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, PredictError> {
    fields.get(name).ok_or(PredictError::MissingField(name))
}

/// Accepts numbers, numeric strings and booleans.
fn coerce_number(field: &'static str, value: &Value) -> Result<f64, PredictError> {
    let invalid = |message: String| PredictError::InvalidField { field, message };
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("could not convert string to float: '{}'", s))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Err(invalid("value is null".to_string())),
        _ => Err(invalid("expected a number".to_string())),
    }
}

/// Integer coercion of `month`.
///
/// Integers pass through, finite floats truncate toward zero, strings must
/// hold a base-10 integer (sign and `_` separators allowed), booleans are
/// 1 or 0. Anything outside the signed 64-bit range is rejected.
pub fn coerce_month(value: &Value) -> Result<i64, PredictError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.is_u64() {
                return Err(PredictError::InvalidMonth(format!("{} is out of range", n)));
            }
            let f = n.as_f64().unwrap_or(f64::NAN);
            let truncated = f.trunc();
            // i64::MIN is exactly representable; i64::MAX + 1 is the first float above range
            if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(PredictError::InvalidMonth(format!("{} is out of range", n)));
            }
            Ok(truncated as i64)
        }
        Value::String(s) => parse_int_literal(s)
            .ok_or_else(|| PredictError::InvalidMonth(format!("invalid literal for int(): '{}'", s))),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Null => Err(PredictError::InvalidMonth("value is null".to_string())),
        _ => Err(PredictError::InvalidMonth("expected an integer".to_string())),
    }
}

fn parse_int_literal(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    // Underscores only between digits: "1_2" is fine, "_12", "12_" and "1__2" are not.
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '_')
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let signed = if negative { format!("-{}", cleaned) } else { cleaned };
    signed.parse::<i64>().ok()
}

// ============================================================================
// Feature Assembly
// ============================================================================

/// Builds the feature row for a request.
///
/// Weather columns come from the wrapped month key; `month_periods` keeps
/// the caller's original month.
pub fn build_feature_row(request: &PredictionRequest) -> FeatureRow {
    let stats = weather::stats_for_month(request.month);
    FeatureRow {
        home_size: request.home_size,
        num_appliances: request.num_appliances,
        temp_degree_days: stats.temp_degree_days,
        temp_cdd: stats.temp_cdd,
        temp_hdd: stats.temp_hdd,
        month_periods: request.month as f64,
    }
}

/// Parses, assembles and runs inference. No side effects.
pub fn predict_bill(body: &[u8], backend: &dyn InferenceBackend) -> Result<f64, PredictError> {
    let request = PredictionRequest::from_body(body)?;
    let row = build_feature_row(&request);
    let scaled = backend.transform(&row)?;
    backend.predict(&scaled)
}

/// Request boundary: every outcome becomes a status code and JSON body.
///
/// `200 {success: true, predicted_bill}` on success; any failure, input or
/// inference, is `500 {success: false, error}`.
pub fn handle_predict(
    body: &[u8],
    backend: &dyn InferenceBackend,
) -> (StatusCode, PredictionResponse) {
    respond(predict_bill(body, backend))
}

pub fn respond(result: Result<f64, PredictError>) -> (StatusCode, PredictionResponse) {
    match result {
        Ok(bill) => (StatusCode::OK, PredictionResponse::success(bill)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            PredictionResponse::failure(e.to_string()),
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScaledRow;
    use std::sync::Mutex;

    /// Records the rows it sees; predicts the sum of the scaled row.
    #[derive(Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<FeatureRow>>,
    }

    impl InferenceBackend for RecordingBackend {
        fn transform(&self, row: &FeatureRow) -> Result<ScaledRow, PredictError> {
            self.seen.lock().unwrap().push(*row);
            Ok(ScaledRow(row.to_array()))
        }

        fn predict(&self, row: &ScaledRow) -> Result<f64, PredictError> {
            Ok(row.0.iter().sum())
        }
    }

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn transform(&self, _row: &FeatureRow) -> Result<ScaledRow, PredictError> {
            Err(PredictError::Inference("shape mismatch".to_string()))
        }

        fn predict(&self, _row: &ScaledRow) -> Result<f64, PredictError> {
            unreachable!("predict must not run after a failed transform")
        }
    }

    #[test]
    fn test_feature_row_for_month_three() {
        let backend = RecordingBackend::default();
        let body = br#"{"home_size": 1500, "num_appliances": 8, "month": 3}"#;
        let (status, response) = handle_predict(body, &backend);

        assert_eq!(status, StatusCode::OK);
        assert!(response.success);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            FeatureRow {
                home_size: 1500.0,
                num_appliances: 8.0,
                temp_degree_days: 5112.060606060606,
                temp_cdd: 1688.2727272727273,
                temp_hdd: 3423.787878787879,
                month_periods: 3.0,
            }
        );
        assert_eq!(response.predicted_bill, Some(seen[0].to_array().iter().sum::<f64>()));
    }

    #[test]
    fn test_month_periods_keeps_unwrapped_month() {
        let backend = RecordingBackend::default();
        handle_predict(br#"{"home_size": 900, "num_appliances": 3, "month": 7}"#, &backend);
        handle_predict(br#"{"home_size": 900, "num_appliances": 3, "month": -4}"#, &backend);

        let seen = backend.seen.lock().unwrap();
        let key2 = weather::WEATHER_TABLE[1].stats;
        assert_eq!(seen[0].month_periods, 7.0);
        assert_eq!(seen[0].temp_cdd, key2.temp_cdd);

        let key1 = weather::WEATHER_TABLE[0].stats;
        assert_eq!(seen[1].month_periods, -4.0);
        assert_eq!(seen[1].temp_hdd, key1.temp_hdd);
    }

    #[test]
    fn test_repeated_requests_are_deterministic() {
        let backend = RecordingBackend::default();
        let body = br#"{"home_size": 1234.5, "num_appliances": 6, "month": 11}"#;
        let first = handle_predict(body, &backend);
        let second = handle_predict(body, &backend);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_fields_fail_without_panicking() {
        let backend = RecordingBackend::default();
        for body in [
            &br#"{"num_appliances": 8, "month": 3}"#[..],
            &br#"{"home_size": 1500, "month": 3}"#[..],
            &br#"{"home_size": 1500, "num_appliances": 8}"#[..],
        ] {
            let (status, response) = handle_predict(body, &backend);
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!response.success);
            assert!(response.error.unwrap().starts_with("Missing required field"));
        }
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_numeric_month_fails() {
        let backend = RecordingBackend::default();
        let (status, response) =
            handle_predict(br#"{"home_size": 1500, "num_appliances": 8, "month": "march"}"#, &backend);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.error.as_deref(),
            Some("Invalid month: invalid literal for int(): 'march'")
        );
    }

    #[test]
    fn test_malformed_bodies_fail() {
        let backend = RecordingBackend::default();
        for body in [&b""[..], &b"not json"[..], &b"[1, 2, 3]"[..], &b"null"[..]] {
            let (status, response) = handle_predict(body, &backend);
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!response.success);
        }
    }

    #[test]
    fn test_inference_failure_becomes_failure_response() {
        let (status, response) =
            handle_predict(br#"{"home_size": 1500, "num_appliances": 8, "month": 3}"#, &FailingBackend);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.as_deref(), Some("Inference failed: shape mismatch"));
    }

    #[test]
    fn test_month_coercion() {
        use serde_json::json;
        assert_eq!(coerce_month(&json!(3)), Ok(3));
        assert_eq!(coerce_month(&json!(-4)), Ok(-4));
        assert_eq!(coerce_month(&json!(3.9)), Ok(3));
        assert_eq!(coerce_month(&json!(-2.5)), Ok(-2));
        assert_eq!(coerce_month(&json!(" 12 ")), Ok(12));
        assert_eq!(coerce_month(&json!("+7")), Ok(7));
        assert_eq!(coerce_month(&json!("1_0")), Ok(10));
        assert_eq!(coerce_month(&json!(true)), Ok(1));

        for bad in [json!("3.5"), json!(""), json!("_1"), json!(null), json!([3]), json!(u64::MAX)] {
            assert!(coerce_month(&bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_number_coercion() {
        use serde_json::json;
        assert_eq!(coerce_number("home_size", &json!(1500)), Ok(1500.0));
        assert_eq!(coerce_number("home_size", &json!("1500.5")), Ok(1500.5));
        assert_eq!(coerce_number("home_size", &json!(false)), Ok(0.0));
        assert!(coerce_number("home_size", &json!(null)).is_err());
        assert!(coerce_number("home_size", &json!("big")).is_err());
        assert!(coerce_number("home_size", &json!({"sqft": 1})).is_err());
    }
}
