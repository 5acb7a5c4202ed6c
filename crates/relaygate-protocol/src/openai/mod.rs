pub mod create_chat_completions;
pub mod types;

pub use types::*;
