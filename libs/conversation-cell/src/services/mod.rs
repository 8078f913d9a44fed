pub mod extractor;
pub mod orchestrator;
pub mod sessions;
pub mod validation;

pub use extractor::{InfoExtractor, PatternExtractor};
pub use orchestrator::ConversationService;
pub use sessions::SessionStore;
pub use validation::{validate_email, validate_phone};
