use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::{Chain, TurnInput};
use crate::error::GenerationError;
use crate::llm::Completion;
use crate::prompt::{self, PromptTemplate, ANSWER_PROMPT};

/// The turn input plus the generated SQL and what running it returned.
#[derive(Debug, Clone)]
pub struct AnswerInput {
    pub turn: TurnInput,
    pub query: String,
    pub response: String,
}

pub struct AnswerChain {
    client: Arc<dyn Completion>,
    template: PromptTemplate,
}

#[async_trait]
impl Chain for AnswerChain {
    type Input = AnswerInput;

    /// Returns the completion untouched.
    async fn run(&self, input: &AnswerInput) -> Result<String, GenerationError> {
        let prompt = self.construct_prompt(input)?;
        self.client.complete(&prompt).await
    }
}

impl AnswerChain {
    pub fn new(client: Arc<dyn Completion>) -> Self {
        Self {
            client,
            template: ANSWER_PROMPT,
        }
    }

    pub fn construct_prompt(&self, input: &AnswerInput) -> Result<String, GenerationError> {
        Ok(self.template.render(&[
            (prompt::SCHEMA, input.turn.schema.as_str()),
            (prompt::CHAT_HISTORY, input.turn.chat_history.as_str()),
            (prompt::QUERY, input.query.as_str()),
            (prompt::QUESTION, input.turn.question.as_str()),
            (prompt::RESPONSE, input.response.as_str()),
        ])?)
    }
}
