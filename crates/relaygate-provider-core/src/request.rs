use relaygate_protocol::claude;
use relaygate_protocol::gemini;
use relaygate_protocol::openai;
use bytes::Bytes;
use http::HeaderMap;

#[derive(Debug, Clone)]
pub enum ProxyRequest {
    ClaudeMessages(claude::create_message::request::CreateMessageRequest),
    ClaudeMessagesStream(claude::create_message::request::CreateMessageRequest),

    GeminiGenerate(gemini::generate_content::request::GenerateContentRequest),
    GeminiGenerateStream(gemini::generate_content::request::GenerateContentRequest),

    OpenAIChat(openai::create_chat_completions::request::CreateChatCompletionRequest),
    OpenAIChatStream(openai::create_chat_completions::request::CreateChatCompletionRequest),

    /// `/v1/completions`, `/v1/embeddings`, `/v1/images/generations`, `/v1/responses` — forwarded
    /// bit-for-bit to an OpenAI-type or Proxy-type credential; no dialect conversion exists for
    /// these on Anthropic or Vertex/Gemini credentials.
    OpenAIPassthrough { path: String, headers: HeaderMap, body: Bytes },
}
