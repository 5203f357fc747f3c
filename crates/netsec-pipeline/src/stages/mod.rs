//! The four pipeline stages. Each one reads its input artifact's files from
//! disk, writes its own files under the run directory and returns a new
//! artifact describing them.
pub mod ingestion;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use ingestion::DataIngestion;
pub use trainer::ModelTrainer;
pub use transformation::DataTransformation;
pub use validation::DataValidation;
