//! Heuristic crop estimators and the static market catalogue
//!
//! Pure functions; randomness comes in through a [`NoiseSource`].

pub mod crop_estimator;
pub mod market_catalogue;
pub mod noise;

pub use crop_estimator::*;
pub use market_catalogue::*;
pub use noise::*;
