pub mod content;
pub mod generate_content;
pub mod types;

pub use types::*;
