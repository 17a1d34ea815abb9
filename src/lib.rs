//! Flight delay prediction
//!
//! One-hot encodes flight records against the column order a logistic
//! regression was trained on, and scores them with that model.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod types;

pub use error::{DelayError, Result};
pub use features::{FeatureEncoder, FeatureMatrix, DEFAULT_FEATURE_COLUMNS};
pub use model::{DelayPredictor, LoadedModel, LogisticModel};
pub use types::{FlightField, FlightRecord};
