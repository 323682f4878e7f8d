//! One user's chat session: the transcript, the current database handle and
//! the two-step question → SQL → answer turn.

use std::fmt;
use std::sync::Arc;

use crate::answer_chain::{AnswerChain, AnswerInput};
use crate::chain::{Chain, TurnInput};
use crate::config::ConnectionParams;
use crate::conversation::{Conversation, Turn};
use crate::database::{Connector, Database};
use crate::error::{ConnectionError, ExecutionError, TurnError};
use crate::llm::Completion;
use crate::text_to_sql_chain::TextToSqlChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingQuestion,
    GeneratingSql,
    Executing,
    GeneratingAnswer,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::AwaitingQuestion => "awaiting_question",
            TurnPhase::GeneratingSql => "generating_sql",
            TurnPhase::Executing => "executing",
            TurnPhase::GeneratingAnswer => "generating_answer",
        };
        f.write_str(name)
    }
}

pub struct Session {
    conversation: Conversation,
    database: Option<Box<dyn Database>>,
    connector: Arc<dyn Connector>,
    sql_chain: TextToSqlChain,
    answer_chain: AnswerChain,
    phase: TurnPhase,
}

impl Session {
    pub fn new(client: Arc<dyn Completion>, connector: Arc<dyn Connector>) -> Self {
        Self {
            conversation: Conversation::new(),
            database: None,
            connector,
            sql_chain: TextToSqlChain::new(client.clone()),
            answer_chain: AnswerChain::new(client),
            phase: TurnPhase::Idle,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.database.is_some()
    }

    /// Opens a new handle and swaps it in, closing the old one. On failure
    /// the current handle, if any, stays in place.
    pub async fn connect(&mut self, params: &ConnectionParams) -> Result<(), ConnectionError> {
        let database = self.connector.connect(params).await.map_err(|e| {
            tracing::warn!(error = %e, ?params, "connection failed");
            e
        })?;

        if let Some(previous) = self.database.replace(database) {
            previous.close().await;
        }

        Ok(())
    }

    /// Answers one question.
    ///
    /// Blank input is ignored and yields `Ok(None)`. The question is recorded
    /// before any work starts and stays recorded if the turn fails; only a
    /// successful answer is appended after it.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>, TurnError> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        self.transition(TurnPhase::AwaitingQuestion);
        self.conversation.push(Turn::human(question));

        let result = self.run_turn(question).await;
        self.transition(TurnPhase::Idle);

        match result {
            Ok(answer) => {
                self.conversation.push(Turn::assistant(answer.clone()));
                Ok(Some(answer))
            }
            Err(e) => {
                tracing::warn!(error = %e, "turn failed");
                Err(e)
            }
        }
    }

    /// Closes the current handle, ending the session's database access.
    pub async fn close(&mut self) {
        if let Some(database) = self.database.take() {
            database.close().await;
        }
    }

    async fn run_turn(&mut self, question: &str) -> Result<String, TurnError> {
        self.transition(TurnPhase::GeneratingSql);

        // One handle for the whole turn.
        let Self {
            conversation,
            database,
            sql_chain,
            answer_chain,
            phase,
            ..
        } = self;
        let database = database.as_deref().ok_or(ExecutionError::NotConnected)?;

        let turn = TurnInput {
            schema: database.schema_description().await?,
            chat_history: conversation.render(),
            question: question.to_string(),
        };

        let query = sql_chain.run(&turn).await?;

        set_phase(phase, TurnPhase::Executing);
        let response = database.execute(&query).await?;

        set_phase(phase, TurnPhase::GeneratingAnswer);
        let answer = answer_chain
            .run(&AnswerInput {
                turn,
                query,
                response,
            })
            .await?;

        Ok(answer)
    }

    fn transition(&mut self, next: TurnPhase) {
        set_phase(&mut self.phase, next);
    }
}

fn set_phase(phase: &mut TurnPhase, next: TurnPhase) {
    tracing::debug!(from = %phase, to = %next, "turn phase");
    *phase = next;
}
