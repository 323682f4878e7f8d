use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::{Chain, TurnInput};
use crate::error::GenerationError;
use crate::llm::Completion;
use crate::prompt::{self, PromptTemplate, SQL_PROMPT};

pub struct TextToSqlChain {
    client: Arc<dyn Completion>,
    template: PromptTemplate,
}

#[async_trait]
impl Chain for TextToSqlChain {
    type Input = TurnInput;

    async fn run(&self, input: &TurnInput) -> Result<String, GenerationError> {
        let prompt = self.construct_prompt(input)?;

        let completion = self.client.complete(&prompt).await?;
        let sql_query = completion.trim();

        if sql_query.is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        tracing::info!(sql = %sql_query, "sql generated");

        Ok(sql_query.to_string())
    }
}

impl TextToSqlChain {
    pub fn new(client: Arc<dyn Completion>) -> Self {
        Self {
            client,
            template: SQL_PROMPT,
        }
    }

    pub fn construct_prompt(&self, input: &TurnInput) -> Result<String, GenerationError> {
        Ok(self.template.render(&[
            (prompt::SCHEMA, input.schema.as_str()),
            (prompt::CHAT_HISTORY, input.chat_history.as_str()),
            (prompt::QUESTION, input.question.as_str()),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;

    fn input() -> TurnInput {
        TurnInput {
            schema: "CREATE TABLE \"Artist\" (\n\t\"Name\" text\n)".to_string(),
            chat_history: "AI: Hello!\nHuman: Name 10 artists".to_string(),
            question: "Name 10 artists".to_string(),
        }
    }

    #[tokio::test]
    async fn test_run_trims_completion() {
        let llm = Arc::new(ScriptedLlm::new(["\n  SELECT Name FROM Artist LIMIT 10;  \n"]));
        let chain = TextToSqlChain::new(llm.clone());

        let sql = chain.run(&input()).await.unwrap();

        assert_eq!(sql, "SELECT Name FROM Artist LIMIT 10;");
        assert_eq!(llm.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_run_sends_rendered_prompt() {
        let llm = Arc::new(ScriptedLlm::new(["SELECT 1;"]));
        let chain = TextToSqlChain::new(llm.clone());
        let input = input();

        chain.run(&input).await.unwrap();

        let prompts = llm.prompts();
        assert!(prompts[0].contains(&input.schema));
        assert!(prompts[0].contains(&input.chat_history));
        assert!(prompts[0].contains("Question: Name 10 artists\nSQL Query:"));
    }

    #[tokio::test]
    async fn test_blank_completion_is_an_error() {
        let chain = TextToSqlChain::new(Arc::new(ScriptedLlm::new(["   \n"])));
        let result = chain.run(&input()).await;
        assert!(matches!(result, Err(GenerationError::EmptyCompletion)));
    }

    #[test]
    fn test_prompt_includes_few_shot_examples() {
        let chain = TextToSqlChain::new(Arc::new(ScriptedLlm::new(Vec::<&str>::new())));
        let prompt = chain.construct_prompt(&input()).unwrap();
        assert!(prompt.contains("SELECT Name FROM Artist LIMIT 10;"));
        assert!(prompt.contains("ORDER BY track_count DESC LIMIT 3;"));
        assert!(prompt.contains("Write only the SQL query"));
    }
}
