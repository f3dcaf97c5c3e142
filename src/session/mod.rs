pub mod manager;
pub mod memory;
pub mod types;

pub use manager::ConversationStore;
pub use types::{Session, Turn, TurnRole};
