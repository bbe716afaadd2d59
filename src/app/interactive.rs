//! Line-by-line session: one request per line, each generated query is
//! shown and only executed when the user confirms.
//!
//! Answers to the confirmation prompt: `y` runs the query, `q` ends the
//! session, anything else skips it. At the request prompt, `\run` runs the
//! last generated query again and `quit` (or `exit`, `\q`) ends the session.
//! The last query is kept in memory for the session only.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use super::pipeline::Pipeline;
use crate::{
    error::{AppResult, file_read_error, file_write_error},
    llm::CompletionService,
    output::{OutputOptions, format_generated, format_run_outcome},
    query::GeneratedQuery
};

enum Answer {
    Run,
    Skip,
    Quit
}

/// Run an interactive session until end of input or `quit`
pub async fn run_interactive<S, R, W>(
    pipeline: &Pipeline<S>,
    mut input: R,
    output: &mut W,
    opts: &OutputOptions
) -> AppResult<i32>
where
    S: CompletionService,
    R: AsyncBufRead + Unpin,
    W: Write
{
    let mut last: Option<GeneratedQuery> = None;
    write_out(
        output,
        "Ask a question about the database. Type 'quit' to leave.\n"
    )?;

    loop {
        write_out(output, "> ")?;
        let Some(line) = read_line(&mut input).await? else {
            break;
        };
        let request = line.trim();
        match request {
            "" => continue,
            "quit" | "exit" | "\\q" => break,
            "\\run" => {
                match &last {
                    Some(query) => run_and_print(pipeline, query, output, opts)?,
                    None => write_out(output, "No query generated yet.\n")?
                }
                continue;
            }
            _ => {}
        }

        let query = match pipeline.generate(request).await {
            Ok(query) => query,
            Err(e) => {
                write_out(output, &format!("Error: {}\n", e.render_message()))?;
                continue;
            }
        };
        write_out(output, &format!("{}\n", format_generated(&query, false, opts)))?;

        write_out(output, "Run this query? [y/N/q] ")?;
        let answer = read_line(&mut input)
            .await?
            .map(|a| parse_answer(&a))
            .unwrap_or(Answer::Quit);
        match answer {
            Answer::Run => run_and_print(pipeline, &query, output, opts)?,
            Answer::Skip => write_out(output, "Skipped.\n")?,
            Answer::Quit => break
        }
        last = Some(query);
    }

    debug!(retained = last.is_some(), "interactive session ended");
    Ok(0)
}

fn run_and_print<S, W>(
    pipeline: &Pipeline<S>,
    query: &GeneratedQuery,
    output: &mut W,
    opts: &OutputOptions
) -> AppResult<()>
where
    S: CompletionService,
    W: Write
{
    let outcome = pipeline.run(&query.sql);
    write_out(output, &format!("{}\n", format_run_outcome(&outcome, opts)))
}

fn parse_answer(answer: &str) -> Answer {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Answer::Run,
        "q" | "quit" => Answer::Quit,
        _ => Answer::Skip
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> AppResult<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .await
        .map_err(|e| file_read_error("stdin", e))?;
    Ok((read > 0).then_some(line))
}

fn write_out<W: Write>(output: &mut W, text: &str) -> AppResult<()> {
    output
        .write_all(text.as_bytes())
        .and_then(|_| output.flush())
        .map_err(|e| file_write_error("stdout", e))
}
