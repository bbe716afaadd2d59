//! Instruction template sent to the completion service.

use crate::query::SqlDialect;

/// Build the generation prompt.
///
/// The schema and the request are embedded verbatim; the same inputs always
/// produce the same prompt.
pub fn build_prompt(schema: &str, request: &str, dialect: SqlDialect) -> String {
    format!(
        "You are an assistant which takes as input a request written in natural language \
         and converts it into a well structured SQL query in {dialect}.\n\
         The schema of the database is:\n{schema}\n\n\
         Do not provide an explanation of the query, just the query.\n\
         Return ONLY the raw SQL without any markdown formatting, code blocks, or backticks.\n\n\
         Convert the following request into an SQL query: {request}",
        dialect = dialect.display_name(),
        schema = schema,
        request = request
    )
}
