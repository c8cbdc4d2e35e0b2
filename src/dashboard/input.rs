//! Prediction form validation.
//!
//! Raw text from the four feature fields must parse to finite numbers and
//! the model must be one the service knows. Nothing here touches the
//! network; a rejected form never becomes a request.

use crate::error::{DashboardError, Result};
use crate::service::PredictionRequest;

/// Feature fields, in request order.
pub const FEATURE_NAMES: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// Parse the four raw feature inputs.
pub fn parse_features<S: AsRef<str>>(raw: &[S]) -> Result<[f64; 4]> {
    if raw.len() != FEATURE_NAMES.len() {
        return Err(DashboardError::InvalidInput(format!(
            "expected {} features, got {}",
            FEATURE_NAMES.len(),
            raw.len()
        )));
    }

    let mut features = [0.0; 4];
    for (slot, (name, input)) in features.iter_mut().zip(FEATURE_NAMES.iter().zip(raw)) {
        let text = input.as_ref().trim();
        *slot = match text.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                return Err(DashboardError::InvalidInput(format!(
                    "{name} must be a finite number, got \"{text}\""
                )));
            }
        };
    }
    Ok(features)
}

/// Check that `model` is one of the known identifiers.
pub fn check_model(model: &str, known: &[String]) -> Result<()> {
    if known.iter().any(|m| m == model) {
        Ok(())
    } else {
        Err(DashboardError::InvalidInput(format!(
            "unknown model '{model}' (expected one of: {})",
            known.join(", ")
        )))
    }
}

/// Validate a whole form into a request.
pub fn build_request<S: AsRef<str>>(
    raw_features: &[S],
    model: &str,
    known_models: &[String],
) -> Result<PredictionRequest> {
    let features = parse_features(raw_features)?;
    check_model(model, known_models)?;
    Ok(PredictionRequest {
        features,
        model: model.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<String> {
        vec!["logistic_regression".to_string(), "naive_bayes".to_string()]
    }

    #[test]
    fn test_valid_form() {
        let req = build_request(&["5.1", " 3.5 ", "1.4", "0.2"], "naive_bayes", &known()).unwrap();
        assert_eq!(req.features, [5.1, 3.5, 1.4, 0.2]);
        assert_eq!(req.model, "naive_bayes");
    }

    #[test]
    fn test_non_numeric_feature_names_field() {
        let err = parse_features(&["5.1", "3.5", "1.4", "abc"]).unwrap_err();
        match err {
            DashboardError::InvalidInput(msg) => {
                assert!(msg.contains("petal_width"));
                assert!(msg.contains("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert!(parse_features(&["", "3.5", "1.4", "0.2"]).is_err());
        assert!(parse_features(&["NaN", "3.5", "1.4", "0.2"]).is_err());
        assert!(parse_features(&["5.1", "inf", "1.4", "0.2"]).is_err());
        assert!(parse_features(&["5.1", "3.5", "1e400", "0.2"]).is_err());
    }

    #[test]
    fn test_wrong_feature_count() {
        assert!(parse_features(&["5.1", "3.5", "1.4"]).is_err());
        assert!(parse_features(&["1", "2", "3", "4", "5"]).is_err());
    }

    #[test]
    fn test_unknown_model() {
        let err = build_request(&["1", "2", "3", "4"], "random_forest", &known()).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidInput(_)));
    }
}
