use serde::{Deserialize, Serialize};

use crate::{Op, Proto, TransformContext};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ClaudeGenerate = 0,
    ClaudeGenerateStream = 1,
    GeminiGenerate = 2,
    GeminiGenerateStream = 3,
    OpenAIChatGenerate = 4,
    OpenAIChatGenerateStream = 5,
}

impl OperationKind {
    pub const COUNT: usize = 6;

    pub fn from_context(ctx: &TransformContext) -> Option<Self> {
        match ctx.src_op {
            Op::GenerateContent => match ctx.src {
                Proto::Claude => Some(OperationKind::ClaudeGenerate),
                Proto::Gemini => Some(OperationKind::GeminiGenerate),
                Proto::OpenAIChat => Some(OperationKind::OpenAIChatGenerate),
            },
            Op::StreamGenerateContent => match ctx.src {
                Proto::Claude => Some(OperationKind::ClaudeGenerateStream),
                Proto::Gemini => Some(OperationKind::GeminiGenerateStream),
                Proto::OpenAIChat => Some(OperationKind::OpenAIChatGenerateStream),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchRule {
    /// The provider can handle this request in its current protocol/shape (no transform needed).
    Native,
    /// Transform to the target protocol first, then call the provider in that protocol.
    Transform { target: Proto },
    /// Not supported by this provider.
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatchTable {
    ops: [DispatchRule; OperationKind::COUNT],
}

impl DispatchTable {
    pub const fn new(ops: [DispatchRule; OperationKind::COUNT]) -> Self {
        Self { ops }
    }

    pub fn rule(&self, kind: OperationKind) -> DispatchRule {
        self.ops[kind as usize]
    }
    pub fn rule_for_context(&self, ctx: &TransformContext) -> DispatchRule {
        match OperationKind::from_context(ctx) {
            Some(kind) => self.rule(kind),
            None => DispatchRule::Unsupported,
        }
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self {
            ops: [DispatchRule::Unsupported; OperationKind::COUNT],
        }
    }
}
