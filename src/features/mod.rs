pub mod derived;
pub mod encoder;

pub use derived::{DerivedFeatures, PeriodDay, ScheduledOperation};
pub use encoder::{FeatureEncoder, FeatureMatrix, DEFAULT_FEATURE_COLUMNS};
