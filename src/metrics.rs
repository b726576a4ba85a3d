//! Метрики качества регрессии

use linfa::prelude::SingleTargetRegression;
use ndarray::Array1;

use crate::models::ModelError;

/// Коэффициент детерминации R² (через linfa)
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, ModelError> {
    if y_true.is_empty() {
        return Err(ModelError::EmptyData);
    }
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            rows: y_pred.len(),
            targets: y_true.len(),
        });
    }
    y_pred
        .r2(y_true)
        .map_err(|e| ModelError::Backend(e.to_string()))
}
