pub mod classification;
pub mod error;

pub use classification::PatientClassification;
pub use error::AppError;
