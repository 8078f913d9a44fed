pub mod identity;
pub mod patient;

pub use identity::{name_similarity, normalize_name, resolve_identity, token_sort_key, IdentityResolver};
pub use patient::PatientService;
