use std::sync::Arc;

use anyhow::Result;
use config::{ConnectionParams, ModelConfig, SchemaConfig};
use conversation::Turn;
use database::PgConnector;
use llm::OllamaCompletion;
use session::Session;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod answer_chain;
mod chain;
mod config;
mod conversation;
mod database;
mod error;
mod llm;
mod prompt;
mod session;
mod text_to_sql_chain;

#[cfg(test)]
mod testing;

const HELP: &str = "Commands:
  /set <host|port|user|password|database> <value>   edit a connection field
  /connect                                          connect with the current fields
  /settings                                         show the connection fields
  /history                                          show the conversation
  /help                                             show this message
  /quit                                             leave
Anything else is sent as a question.";

enum Command<'a> {
    Set(&'a str, &'a str),
    Connect,
    Settings,
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Question(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let Some(rest) = line.trim().strip_prefix('/') else {
        return Command::Question(line);
    };

    let mut parts = rest.splitn(3, ' ');
    match parts.next().unwrap_or_default() {
        "set" => match (parts.next(), parts.next()) {
            (Some(field), Some(value)) => Command::Set(field, value.trim()),
            _ => Command::Unknown(line),
        },
        "connect" => Command::Connect,
        "settings" => Command::Settings,
        "history" => Command::History,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line),
    }
}

fn print_turn(turn: &Turn) {
    println!("[{}] {}", turn.role(), turn.content());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging()?;

    let mut params = ConnectionParams::from_env();
    let model = ModelConfig::from_env();
    let client = Arc::new(OllamaCompletion::new(&model));
    tracing::info!(model = %client.model(), "session started");

    let connector = Arc::new(PgConnector::new(SchemaConfig::from_env()));
    let mut session = Session::new(client, connector);

    println!("Chat with PostgreSQL");
    println!("{}\n", HELP);
    for turn in session.conversation().turns() {
        print_turn(turn);
    }

    let mut lines = BufReader::new(stdin()).lines();
    let mut out = stdout();

    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Command::Set(field, value) => {
                if params.set(field, value) {
                    println!("{} updated", field);
                } else {
                    println!("Unknown field: {}", field);
                }
            }
            Command::Connect => {
                println!("Connecting to the database...");
                match session.connect(&params).await {
                    Ok(()) => println!("Connected to database!"),
                    Err(e) => println!("Connection failed: {}", e),
                }
            }
            Command::Settings => println!("{:#?}", params),
            Command::History => session.conversation().turns().iter().for_each(print_turn),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Unknown(input) => println!("Unknown command: {}", input.trim()),
            Command::Question(question) => match session.ask(question).await {
                Ok(Some(_)) => {
                    if let Some(answer) = session.conversation().last() {
                        print_turn(answer);
                    }
                }
                Ok(None) => {}
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    session.close().await;
    tracing::debug!(phase = %session.phase(), "session closed");

    Ok(())
}

fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("pg_chat=info,sqlx=warn"))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
