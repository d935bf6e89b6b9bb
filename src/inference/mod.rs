//! Inference module
//!
//! The trained artifact: a fitted preprocessor and the selected estimator,
//! persisted together and applied in one call.

mod model;

pub use model::FareModel;
