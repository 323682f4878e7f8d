//! Stand-ins for the model and the database used by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::ConnectionParams;
use crate::database::{Connector, Database};
use crate::error::{ConnectionError, ExecutionError, GenerationError};
use crate::llm::Completion;

/// Replies with canned completions in order; fails once they run out.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(GenerationError::EmptyCompletion)
    }
}

/// `(handle name, sql)` for every execute call, shared across handles.
pub type ExecutionLog = Arc<Mutex<Vec<(String, String)>>>;

pub struct StubDatabase {
    pub name: String,
    pub schema: String,
    /// `Err` text makes `execute` fail with a query error.
    pub result: Result<String, String>,
    pub log: ExecutionLog,
}

#[async_trait]
impl Database for StubDatabase {
    async fn schema_description(&self) -> Result<String, ExecutionError> {
        Ok(self.schema.clone())
    }

    async fn execute(&self, sql: &str) -> Result<String, ExecutionError> {
        self.log
            .lock()
            .unwrap()
            .push((self.name.clone(), sql.to_string()));

        self.result
            .clone()
            .map_err(|message| ExecutionError::Query(sqlx::Error::Protocol(message)))
    }
}

/// Hands out a `StubDatabase` named after `params.database`; a database
/// named `unreachable` fails to connect.
pub struct StubConnector {
    pub schema: String,
    pub result: Result<String, String>,
    pub log: ExecutionLog,
    pub connects: Mutex<usize>,
}

impl StubConnector {
    pub fn new(schema: &str, result: Result<&str, &str>) -> Self {
        Self {
            schema: schema.to_string(),
            result: result.map(str::to_string).map_err(str::to_string),
            log: Arc::new(Mutex::new(Vec::new())),
            connects: Mutex::new(0),
        }
    }

    pub fn executions(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn Database>, ConnectionError> {
        *self.connects.lock().unwrap() += 1;

        if params.database == "unreachable" {
            return Err(ConnectionError::Connect(sqlx::Error::PoolTimedOut));
        }

        Ok(Box::new(StubDatabase {
            name: params.database.clone(),
            schema: self.schema.clone(),
            result: self.result.clone(),
            log: self.log.clone(),
        }))
    }
}
