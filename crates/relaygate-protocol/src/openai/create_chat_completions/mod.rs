pub mod request;
pub mod response;
pub mod stream;
pub mod types;

pub use request::{CreateChatCompletionRequest, CreateChatCompletionRequestBody, StopConfiguration};
pub use response::CreateChatCompletionResponse;
pub use stream::*;
pub use types::*;
