use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::Decimal;
use sqlx::{Column, Postgres, Row, TypeInfo};

use crate::config::{ConnectionParams, SchemaConfig};
use crate::error::{ConnectionError, ExecutionError};

pub const NO_ROWS: &str = "no rows returned";

/// A live handle to one database.
#[async_trait]
pub trait Database: Send + Sync {
    /// Tables, columns and types, as text for the prompt.
    async fn schema_description(&self) -> Result<String, ExecutionError>;

    /// Runs `sql` as-is and returns the rows as text.
    async fn execute(&self, sql: &str) -> Result<String, ExecutionError>;

    /// Releases the underlying connection.
    async fn close(&self) {}
}

/// Opens database handles from the connection form.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, params: &ConnectionParams)
        -> Result<Box<dyn Database>, ConnectionError>;
}

#[derive(Debug, Clone, Default)]
pub struct PgConnector {
    schema: SchemaConfig,
}

impl PgConnector {
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        params: &ConnectionParams,
    ) -> Result<Box<dyn Database>, ConnectionError> {
        let uri = params.uri()?;

        // A single connection, opened eagerly so bad credentials fail here.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&uri)
            .await?;

        tracing::info!(host = %params.host, database = %params.database, "connected");

        Ok(Box::new(PgDatabase {
            pool,
            sample_rows: self.schema.sample_rows,
        }))
    }
}

pub struct PgDatabase {
    pool: PgPool,
    sample_rows: usize,
}

#[async_trait]
impl Database for PgDatabase {
    async fn schema_description(&self) -> Result<String, ExecutionError> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
             ORDER BY table_name;",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tables_info = Vec::with_capacity(tables.len());

        for table_name in tables {
            let columns: Vec<(String, String)> = sqlx::query_as(
                "SELECT column_name::text, data_type::text FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 \
                 ORDER BY ordinal_position;",
            )
            .bind(&table_name)
            .fetch_all(&self.pool)
            .await?;

            let samples = self.sample_rows(&table_name).await;

            tables_info.push(describe_table(&table_name, &columns, &samples));
        }

        Ok(tables_info.join("\n\n"))
    }

    async fn execute(&self, sql: &str) -> Result<String, ExecutionError> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        if rows.is_empty() {
            return Ok(NO_ROWS.to_string());
        }

        Ok(rows.iter().map(render_row).collect::<Vec<_>>().join("\n"))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

impl PgDatabase {
    async fn sample_rows(&self, table_name: &str) -> Vec<String> {
        if self.sample_rows == 0 {
            return Vec::new();
        }

        let sql = format!(
            "SELECT * FROM {} LIMIT {};",
            quote_identifier(table_name),
            self.sample_rows
        );

        match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows.iter().map(render_row).collect(),
            Err(e) => {
                tracing::warn!(table = table_name, error = %e, "skipping sample rows");
                Vec::new()
            }
        }
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn describe_table(table_name: &str, columns: &[(String, String)], samples: &[String]) -> String {
    let column_lines: Vec<String> = columns
        .iter()
        .map(|(name, data_type)| format!("\t{} {}", quote_identifier(name), data_type))
        .collect();

    let mut description = format!(
        "CREATE TABLE {} (\n{}\n)",
        quote_identifier(table_name),
        column_lines.join(",\n")
    );

    if !samples.is_empty() {
        description.push_str(&format!(
            "\n\n/*\n{} rows from {} table:\n{}\n*/",
            samples.len(),
            table_name,
            samples.join("\n")
        ));
    }

    description
}

fn render_row(row: &PgRow) -> String {
    let fields: Vec<(String, String)> = row
        .columns()
        .iter()
        .map(|column| (column.name().to_string(), render_value(row, column.ordinal())))
        .collect();

    format_row(&fields)
}

fn format_row(fields: &[(String, String)]) -> String {
    let row_string = fields
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{{ {} }}", row_string)
}

fn render_value(row: &PgRow, index: usize) -> String {
    let type_name = row.columns()[index].type_info().name().to_string();

    let rendered = match type_name.as_str() {
        "BOOL" => decode::<bool>(row, index),
        "INT2" => decode::<i16>(row, index),
        "INT4" => decode::<i32>(row, index),
        "INT8" => decode::<i64>(row, index),
        "FLOAT4" => decode::<f32>(row, index),
        "FLOAT8" => decode::<f64>(row, index),
        "NUMERIC" => decode::<Decimal>(row, index),
        "DATE" => decode::<NaiveDate>(row, index),
        "TIME" => decode::<NaiveTime>(row, index),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, index),
        _ => decode::<String>(row, index),
    };

    rendered.unwrap_or_else(|| format!("<{}>", type_name))
}

fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<String>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + ToString,
{
    match row.try_get::<Option<T>, _>(index) {
        Ok(Some(value)) => Some(value.to_string()),
        Ok(None) => Some("NULL".to_string()),
        Err(_) => None,
    }
}
