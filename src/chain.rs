use async_trait::async_trait;

use crate::error::GenerationError;

/// One prompt-and-complete step.
#[async_trait]
pub trait Chain: Send + Sync {
    type Input: Send + Sync;

    async fn run(&self, input: &Self::Input) -> Result<String, GenerationError>;
}

/// What both steps of a turn see: the schema, the transcript so far and
/// the question being answered.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub schema: String,
    pub chat_history: String,
    pub question: String,
}
