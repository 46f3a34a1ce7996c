//! Features Module - Model input schema
//!
//! `layout` owns the ordered feature names, `vector` assembles values.

pub mod layout;
pub mod vector;

pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LayoutInfo};
pub use vector::PredictionInput;
