//! Core provider abstractions for relaygate.
//!
//! This crate intentionally does **not** depend on axum or any concrete HTTP client.
//! Provider implementations should construct `UpstreamHttpRequest` (and optional
//! internal requests like `upstream_usage`), while a higher layer performs IO.

pub mod balancer;
pub mod config;
pub mod credential;
pub mod errors;
pub mod events;
pub mod fail2ban;
pub mod headers;
pub mod provider;
pub mod rate_limiter;
pub mod registry;
pub mod request;
pub mod response;
pub mod token_manager;

pub use balancer::{Balancer, BalancerCredential, BalancerError, ModelChecker};
pub use config::{
    ClaudeCodePreludeText, DispatchRule, DispatchTable, ModelTable, OperationKind, ProviderConfig,
};
pub use credential::{Credential, CredentialId};
pub use errors::{ProviderError, ProviderResult};
pub use events::{
    CredentialBannedEvent, CredentialUnbannedEvent, DownstreamEvent, Event, EventHub, EventSink,
    OperationalEvent, TerminalEventSink, UpstreamEvent,
};
pub use fail2ban::{Fail2ban, Fail2banConfig, Fail2banRule, RecordOutcome};
pub use headers::{Headers, header_get, header_remove, header_set};
pub use provider::{
    AuthRetryAction, HttpMethod, UpstreamBody, UpstreamCtx, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamProvider,
};
pub use rate_limiter::RateLimiter;
pub use registry::ProviderRegistry;
pub use request::ProxyRequest;
pub use response::{ProxyResponse, StreamBody, UpstreamPassthroughError};
pub use token_manager::{CachedToken, TokenError, TokenManager};

// Re-export the protocol/transform typed enums from relaygate-transform.
pub use relaygate_transform::middleware::{
    GenerateContentRequest, GenerateContentResponse, Op, Proto, Request, Response, StreamEvent,
    StreamFormat, TransformContext, TransformError, stream_format,
};

// Re-export usage helpers used by the middleware/engine layer.
pub use relaygate_transform::middleware::{
    OutputAccumulator, UsageAccumulator, UsageSummary, output_for_counting, usage_from_response,
};
