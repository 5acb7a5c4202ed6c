pub mod generate_content;
pub mod middleware;
pub mod stream2nostream;

pub use middleware::*;
