pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use router::{conversation_routes, ConversationState};
pub use services::*;
