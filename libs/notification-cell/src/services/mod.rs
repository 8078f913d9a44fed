pub mod queue;
pub mod sender;
pub mod producer;
pub mod worker;

pub use queue::*;
pub use sender::*;
pub use producer::*;
pub use worker::*;
