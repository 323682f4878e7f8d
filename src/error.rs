use thiserror::Error;

/// The database could not be reached or refused the credentials.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid port: {0:?}")]
    InvalidPort(String),
    #[error("could not connect to database: {0}")]
    Connect(#[from] sqlx::Error),
}

/// A completion call failed or produced nothing usable.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model completion failed: {0}")]
    Provider(#[from] ollama_rs::error::OllamaError),
    #[error("model returned an empty completion")]
    EmptyCompletion,
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Running the generated SQL failed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("not connected to a database")]
    NotConnected,
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("missing value for placeholder {{{0}}}")]
    MissingValue(&'static str),
    #[error("template does not contain placeholder {{{0}}}")]
    MissingPlaceholder(&'static str),
}

/// Why a turn ended without an answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
