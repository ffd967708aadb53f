pub mod extractor;
pub mod validation;

pub use extractor::*;
pub use validation::*;
