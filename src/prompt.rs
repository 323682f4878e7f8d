//! Prompt templates kept as data: the template text plus the names of the
//! placeholders it expects, so substitution can be checked on its own.

use crate::error::PromptError;

pub const SCHEMA: &str = "schema";
pub const CHAT_HISTORY: &str = "chat_history";
pub const QUESTION: &str = "question";
pub const QUERY: &str = "query";
pub const RESPONSE: &str = "response";

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    template: &'static str,
    placeholders: &'static [&'static str],
}

impl PromptTemplate {
    pub const fn new(template: &'static str, placeholders: &'static [&'static str]) -> Self {
        Self {
            template,
            placeholders,
        }
    }

    /// Checks every declared placeholder actually occurs in the template.
    pub fn validate(&self) -> Result<(), PromptError> {
        for name in self.placeholders {
            if !self.template.contains(&format!("{{{}}}", name)) {
                return Err(PromptError::MissingPlaceholder(name));
            }
        }
        Ok(())
    }

    /// Substitutes every `{name}` in one pass. All declared placeholders
    /// must have a value; substituted text is never rescanned.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        self.validate()?;
        for name in self.placeholders {
            if !values.iter().any(|(key, _)| key == name) {
                return Err(PromptError::MissingValue(name));
            }
        }

        let mut out = String::with_capacity(
            self.template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                let name = &after[..close];
                self.placeholders
                    .iter()
                    .any(|placeholder| *placeholder == name)
                    .then(|| values.iter().find(|(key, _)| *key == name))
                    .flatten()
                    .map(|(_, value)| (*value, close))
            });

            match substituted {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

pub const SQL_PROMPT: PromptTemplate = PromptTemplate::new(
    "You are a data analyst at a company. You are talking to a user who is asking questions about the company's database.
Based on the table schema below, write a SQL query that would answer the user's question. Take the conversation history into account.

<SCHEMA>{schema}</SCHEMA>

Conversation History:
{chat_history}

Write only the SQL query and nothing else. Do not wrap the SQL query in any other text, not even backticks or code fences.

For example:
Question: Which 3 artists have the most tracks?
SQL Query: SELECT ArtistId, COUNT(*) as track_count FROM Track GROUP BY ArtistId ORDER BY track_count DESC LIMIT 3;
Question: Name 10 artists
SQL Query: SELECT Name FROM Artist LIMIT 10;

Your turn:

Question: {question}
SQL Query:",
    &[SCHEMA, CHAT_HISTORY, QUESTION],
);

pub const ANSWER_PROMPT: PromptTemplate = PromptTemplate::new(
    "You are a data analyst at a company. You are talking to a user who is asking questions about the company's database.
Based on the table schema below, the question, the SQL query and the SQL response, write a natural language answer.

<SCHEMA>{schema}</SCHEMA>

Conversation History:
{chat_history}
SQL Query: <SQL>{query}</SQL>
User question: {question}
SQL Response: {response}",
    &[SCHEMA, CHAT_HISTORY, QUERY, QUESTION, RESPONSE],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_valid() {
        assert!(SQL_PROMPT.validate().is_ok());
        assert!(ANSWER_PROMPT.validate().is_ok());
    }

    #[test]
    fn test_render_contains_all_values_verbatim() {
        let schema = "CREATE TABLE \"Track\" (\n\t\"ArtistId\" integer,\n\t\"Name\" text\n)";
        let history = "AI: Hello!\nHuman: Name 10 artists";
        let question = "Name 10 artists";

        let prompt = SQL_PROMPT
            .render(&[(SCHEMA, schema), (CHAT_HISTORY, history), (QUESTION, question)])
            .unwrap();

        assert!(prompt.contains(schema));
        assert!(prompt.contains(history));
        assert!(prompt.contains(&format!("Question: {}\nSQL Query:", question)));
        assert!(!prompt.contains("{schema}"));
        assert!(!prompt.contains("{chat_history}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn test_render_reports_missing_value() {
        let err = SQL_PROMPT
            .render(&[(SCHEMA, "s"), (QUESTION, "q")])
            .unwrap_err();
        assert_eq!(err, PromptError::MissingValue(CHAT_HISTORY));
    }

    #[test]
    fn test_validate_reports_undeclared_placeholder() {
        let template = PromptTemplate::new("Schema: {schema}", &[SCHEMA, QUESTION]);
        assert_eq!(
            template.validate(),
            Err(PromptError::MissingPlaceholder(QUESTION))
        );
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let template = PromptTemplate::new("Q: {question} / S: {schema}", &[QUESTION, SCHEMA]);
        let prompt = template
            .render(&[(QUESTION, "what is in {schema}?"), (SCHEMA, "users(id)")])
            .unwrap();
        assert_eq!(prompt, "Q: what is in {schema}? / S: users(id)");
    }

    #[test]
    fn test_unknown_braces_are_kept() {
        let template = PromptTemplate::new("{\"json\": {question}}", &[QUESTION]);
        let prompt = template.render(&[(QUESTION, "1")]).unwrap();
        assert_eq!(prompt, "{\"json\": 1}");
    }
}
