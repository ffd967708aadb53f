pub mod analyzer;
pub mod extraction;
pub mod metrics;
pub mod narrative;
