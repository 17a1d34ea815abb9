use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};

use crate::error::{DelayError, Result};
use crate::features::{FeatureEncoder, FeatureMatrix, DEFAULT_FEATURE_COLUMNS};
use crate::types::FlightRecord;

fn default_threshold() -> f64 {
    0.5
}

fn default_columns() -> Vec<String> {
    DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Serialized logistic-regression artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    #[serde(default = "default_columns")]
    pub feature_columns: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Probability at or above which a row is labelled delayed.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: LogisticModel = serde_json::from_slice(bytes)
            .map_err(|e| DelayError::ModelLoad(format!("failed to parse artifact: {}", e)))?;
        model.check()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| DelayError::ModelLoad(format!("failed to serialize artifact: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_json()?;
        fs::write(path, bytes)
            .map_err(|e| DelayError::ModelLoad(format!("failed to write {}: {}", path.display(), e)))
    }

    fn check(&self) -> Result<()> {
        if self.coefficients.len() != self.feature_columns.len() {
            return Err(DelayError::ModelLoad(format!(
                "{} coefficients for {} feature columns",
                self.coefficients.len(),
                self.feature_columns.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(DelayError::ModelLoad("non-finite weight in artifact".to_string()));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(DelayError::ModelLoad(format!(
                "threshold {} outside (0, 1)",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn decision_function(&self, x: &[f32]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(w, v)| w * f64::from(*v))
            .sum::<f64>()
            + self.intercept
    }

    pub fn probability(&self, x: &[f32]) -> f64 {
        sigmoid(self.decision_function(x))
    }

    pub fn label(&self, x: &[f32]) -> u8 {
        u8::from(self.probability(x) >= self.threshold)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// A validated artifact paired with the encoder for its column order.
/// Never mutated once published.
#[derive(Debug)]
pub struct LoadedModel {
    model: LogisticModel,
    encoder: FeatureEncoder,
}

impl LoadedModel {
    pub fn new(model: LogisticModel) -> Result<Self> {
        model.check()?;
        let encoder = FeatureEncoder::new(&model.feature_columns)
            .map_err(|e| DelayError::ModelLoad(e.to_string()))?;
        Ok(Self { model, encoder })
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn known_columns(&self) -> &[String] {
        self.encoder.columns()
    }

    fn check_width(&self, matrix: &FeatureMatrix) -> Result<()> {
        let expected = self.encoder.width();
        if matrix.width() != expected {
            return Err(DelayError::ShapeMismatch {
                expected,
                actual: matrix.width(),
            });
        }
        Ok(())
    }

    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>> {
        self.check_width(matrix)?;
        Ok(matrix.rows().map(|row| self.model.label(row)).collect())
    }

    pub fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_width(matrix)?;
        Ok(matrix.rows().map(|row| self.model.probability(row)).collect())
    }
}

/// Holds the process-wide model. Loading builds a new [`LoadedModel`] off
/// to the side and swaps the pointer; readers keep whatever snapshot they
/// cloned.
#[derive(Debug, Default)]
pub struct DelayPredictor {
    current: RwLock<Option<Arc<LoadedModel>>>,
}

impl DelayPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: LogisticModel) -> Result<Self> {
        let p = Self::new();
        p.install(model)?;
        Ok(p)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn snapshot(&self) -> Result<Arc<LoadedModel>> {
        self.current.read().clone().ok_or(DelayError::ModelNotLoaded)
    }

    pub fn known_columns(&self) -> Result<Vec<String>> {
        Ok(self.snapshot()?.known_columns().to_vec())
    }

    /// Replace the active model. On error the previous model stays active.
    pub fn install(&self, model: LogisticModel) -> Result<()> {
        let loaded = Arc::new(LoadedModel::new(model)?);
        let width = loaded.encoder().width();
        *self.current.write() = Some(loaded);
        tracing::info!(width, "model installed");
        Ok(())
    }

    pub fn load(&self, bytes: &[u8]) -> Result<()> {
        self.install(LogisticModel::from_json(bytes)?)
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| DelayError::ModelLoad(format!("failed to read {}: {}", path.display(), e)))?;
        self.load(&bytes)?;
        tracing::info!(path = %path.display(), "loaded model artifact");
        Ok(())
    }

    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<u8>> {
        self.snapshot()?.predict(matrix)
    }

    pub fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        self.snapshot()?.predict_proba(matrix)
    }

    /// Encode and score against one snapshot so a concurrent reload cannot
    /// pair one artifact's columns with another's coefficients.
    pub fn predict_records(&self, records: &[FlightRecord]) -> Result<Vec<u8>> {
        let snap = self.snapshot()?;
        let matrix = snap.encoder().encode(records)?;
        snap.predict(&matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model(latam: f64) -> LogisticModel {
        let mut coefficients = vec![0.0; 10];
        // OPERA_Grupo LATAM
        coefficients[3] = latam;
        // MES_12
        coefficients[4] = 2.0;
        LogisticModel {
            feature_columns: default_columns(),
            coefficients,
            intercept: -1.0,
            threshold: 0.5,
        }
    }

    #[test]
    fn test_predict_before_load() {
        let p = DelayPredictor::new();
        let m = FeatureMatrix::from_rows(&[vec![0.0; 10]]).unwrap();
        assert!(matches!(p.predict(&m), Err(DelayError::ModelNotLoaded)));
        assert!(!p.is_loaded());
    }

    #[test]
    fn test_shape_mismatch() {
        let p = DelayPredictor::with_model(toy_model(0.0)).unwrap();
        let m = FeatureMatrix::from_rows(&[vec![0.0; 9]]).unwrap();
        match p.predict(&m) {
            Err(DelayError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 9);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_rule() {
        let p = DelayPredictor::with_model(toy_model(0.0)).unwrap();
        let records = vec![
            FlightRecord::new("Grupo LATAM", "N", 3),
            FlightRecord::new("Grupo LATAM", "N", 12),
        ];
        // z = -1 → 0.27 ; z = 1 → 0.73
        assert_eq!(p.predict_records(&records).unwrap(), vec![0, 1]);

        let probs = p
            .predict_proba(&p.snapshot().unwrap().encoder().encode(&records).unwrap())
            .unwrap();
        assert!(probs[0] < 0.5 && probs[1] > 0.5);
    }

    #[test]
    fn test_probability_at_threshold_is_positive() {
        let mut model = toy_model(0.0);
        model.intercept = 0.0;
        assert_eq!(model.probability(&[0.0; 10]), 0.5);
        assert_eq!(model.label(&[0.0; 10]), 1);
    }

    #[test]
    fn test_load_round_trip_and_defaults() {
        let p = DelayPredictor::new();
        let json = br#"{"coefficients": [0,0,0,0,0,0,0,0,0,0], "intercept": -0.5}"#;
        p.load(json).unwrap();
        let snap = p.snapshot().unwrap();
        assert_eq!(snap.model().threshold, 0.5);
        assert_eq!(snap.known_columns().len(), 10);
        assert_eq!(snap.known_columns()[0], "OPERA_Latin American Wings");
    }

    #[test]
    fn test_bad_artifacts_keep_previous_model() {
        let p = DelayPredictor::with_model(toy_model(3.0)).unwrap();

        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"coefficients": [1.0], "intercept": 0.0}"#,
            br#"{"feature_columns": ["MES_1"], "coefficients": [1.0], "intercept": 0.0, "threshold": 1.5}"#,
            br#"{"feature_columns": ["AIRPORT_SCL"], "coefficients": [1.0], "intercept": 0.0}"#,
            br#"{"feature_columns": [], "coefficients": [], "intercept": 0.0}"#,
        ];
        for bytes in cases {
            let err = p.load(bytes).unwrap_err();
            assert!(matches!(err, DelayError::ModelLoad(_)), "got {:?}", err);
            assert!(err.is_model_unavailable());
        }

        // previous model still answers
        let preds = p.predict_records(&[FlightRecord::new("Grupo LATAM", "N", 3)]).unwrap();
        assert_eq!(preds, vec![1]);
    }

    #[test]
    fn test_reload_replaces_model_but_not_snapshots() {
        let p = DelayPredictor::with_model(toy_model(3.0)).unwrap();
        let old = p.snapshot().unwrap();

        p.install(toy_model(-3.0)).unwrap();

        let records = [FlightRecord::new("Grupo LATAM", "N", 3)];
        let m = old.encoder().encode(&records).unwrap();
        assert_eq!(old.predict(&m).unwrap(), vec![1]);
        assert_eq!(p.predict(&m).unwrap(), vec![0]);
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logreg.json");
        toy_model(1.5).save(&path).unwrap();

        let p = DelayPredictor::new();
        p.load_path(&path).unwrap();
        assert_eq!(p.snapshot().unwrap().model(), &toy_model(1.5));

        let missing = p.load_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, DelayError::ModelLoad(_)));
    }
}
