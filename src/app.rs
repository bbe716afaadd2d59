//! Application logic for the SQL Query Generator CLI.
//!
//! This module contains the command implementations separated from the main
//! entry point to enable testing. Each command returns a [`CommandOutput`]
//! holding the rendered text and the process exit code; only the
//! interactive session writes directly to the terminal.

mod convert;
mod helpers;
mod interactive;
mod pipeline;
mod types;

use std::{io, path::Path};

pub use convert::{convert_dialect, convert_format, provider_label};
pub use helpers::{
    EXIT_FAILURE, build_llm_provider, build_model_client, calculate_exit_code,
    create_output_options, get_effective_family, get_effective_model, read_sql_input,
    resolve_database, resolve_dialect, resolve_provider, spinner
};
pub use interactive::run_interactive;
pub use pipeline::{Pipeline, run_sql};
use tokio::io::BufReader;
use tracing::{info, warn};
pub use types::{CommandOutput, FailureKind, RequestOutcome, RequestStage, RunOutcome};

use crate::{
    cli::{Commands, DatabaseArgs, Format, ModelArgs, OutputArgs},
    config::Config,
    error::{AppResult, config_error},
    executor::{ENGINE_DIALECT, ExecutionResult},
    llm::{CompletionService, LlmClient, prompt::build_prompt},
    output::{
        OutputFormat, OutputOptions, format_generated, format_names, format_request_outcome,
        format_run_outcome, format_schema, format_validation, write_csv_export
    },
    schema::{list_tables, load_schema},
    validator::validate_sql
};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config:   Config,
    pub no_color: bool,
    pub verbose:  bool
}

impl Context {
    fn output_options(&self, format: Format) -> OutputOptions {
        create_output_options(format, self.no_color, self.verbose)
    }
}

/// Run one CLI command
pub async fn run_command(command: Commands, ctx: &Context) -> AppResult<CommandOutput> {
    match command {
        Commands::Generate {
            request,
            database,
            model,
            dry_run,
            raw,
            format
        } => {
            let opts = ctx.output_options(format);
            if dry_run {
                return run_dry_run(&request, &database, ctx);
            }
            let pipeline = build_pipeline(&database, &model, ctx)?;
            let generated = with_spinner(&pipeline, pipeline.generate(&request)).await?;
            Ok(CommandOutput::success(format_generated(&generated, raw, &opts)))
        }
        Commands::Run {
            input,
            database,
            output
        } => {
            let sql = read_sql_input(&input)?;
            let path = resolve_database(&database, &ctx.config)?;
            let outcome = run_sql(&sql, &path);
            let opts = ctx.output_options(output.format);
            let mut stdout = format_run_outcome(&outcome, &opts);
            export(outcome.result(), &output, &opts, &mut stdout)?;
            Ok(CommandOutput {
                exit_code: calculate_exit_code(outcome.is_success()),
                stdout
            })
        }
        Commands::Ask {
            request,
            database,
            model,
            output
        } => {
            let pipeline = build_pipeline(&database, &model, ctx)?;
            let outcome = with_spinner(&pipeline, pipeline.ask(&request)).await;
            let opts = ctx.output_options(output.format);
            let mut stdout = format_request_outcome(&outcome, &opts);
            let result = match &outcome {
                RequestOutcome::Completed {
                    outcome, ..
                } => outcome.result(),
                _ => None
            };
            export(result, &output, &opts, &mut stdout)?;
            Ok(CommandOutput {
                exit_code: calculate_exit_code(outcome.is_success()),
                stdout
            })
        }
        Commands::Validate {
            input,
            dialect,
            format
        } => {
            let sql = read_sql_input(&input)?;
            let result = validate_sql(&sql, resolve_dialect(dialect));
            Ok(CommandOutput {
                exit_code: calculate_exit_code(result.is_valid),
                stdout:    format_validation(&result, &ctx.output_options(format))
            })
        }
        Commands::Schema {
            database
        } => {
            let path = resolve_database(&database, &ctx.config)?;
            let schema = load_schema(&path)?;
            Ok(CommandOutput::success(format_schema(
                &schema,
                &ctx.output_options(Format::Text)
            )))
        }
        Commands::Tables {
            database,
            format
        } => {
            let path = resolve_database(&database, &ctx.config)?;
            let tables = list_tables(&path)?;
            Ok(CommandOutput::success(format_names(
                "Tables",
                &tables,
                &ctx.output_options(format)
            )))
        }
        Commands::Models {
            model,
            all
        } => {
            let client = build_model_client(&model, &ctx.config)?;
            let pb = spinner("Listing models...");
            let models = if all {
                client.service().list_models().await
            } else {
                client.family_models().await
            };
            pb.finish_and_clear();
            let title = if all {
                String::from("Models")
            } else {
                format!("Models in family '{}'", client.settings().family)
            };
            Ok(CommandOutput::success(format_names(
                &title,
                &models?,
                &ctx.output_options(Format::Text)
            )))
        }
        Commands::Interactive {
            database,
            model,
            format
        } => {
            let pipeline = build_pipeline(&database, &model, ctx)?;
            let mut stdout = io::stdout();
            let exit_code = run_interactive(
                &pipeline,
                BufReader::new(tokio::io::stdin()),
                &mut stdout,
                &ctx.output_options(format)
            )
            .await?;
            Ok(CommandOutput {
                exit_code,
                stdout: String::new()
            })
        }
    }
}

fn build_pipeline(
    database: &DatabaseArgs,
    model: &ModelArgs,
    ctx: &Context
) -> AppResult<Pipeline<LlmClient>> {
    let path = resolve_database(database, &ctx.config)?;
    let client = build_model_client(model, &ctx.config)?;
    Ok(Pipeline::new(path, client))
}

async fn with_spinner<S, F, T>(pipeline: &Pipeline<S>, work: F) -> T
where
    S: CompletionService,
    F: Future<Output = T>
{
    let pb = spinner(&format!(
        "Generating SQL with {}...",
        pipeline.client().settings().model
    ));
    let value = work.await;
    pb.finish_and_clear();
    value
}

/// Build the prompt without calling the model
fn run_dry_run(request: &str, database: &DatabaseArgs, ctx: &Context) -> AppResult<CommandOutput> {
    if request.trim().is_empty() {
        return Err(config_error("Request must not be empty"));
    }
    let path = resolve_database(database, &ctx.config)?;
    let schema = load_schema(&path)?;
    let prompt = build_prompt(schema.as_str(), request, ENGINE_DIALECT);
    Ok(CommandOutput::success(format!(
        "=== DRY RUN - Would send to LLM ===\n\n{}",
        prompt
    )))
}

fn export(
    result: Option<&ExecutionResult>,
    output: &OutputArgs,
    opts: &OutputOptions,
    stdout: &mut String
) -> AppResult<()> {
    let Some(path) = output.export.as_deref() else {
        return Ok(());
    };
    match result.and_then(ExecutionResult::rows) {
        Some(rows) => {
            write_csv_export(rows, path)?;
            info!(rows = rows.len(), path = %path.display(), "exported result");
            if opts.format == OutputFormat::Text {
                stdout.push_str(&export_note(rows.len(), path));
            }
        }
        None => warn!(path = %path.display(), "no rows to export")
    }
    Ok(())
}

fn export_note(rows: usize, path: &Path) -> String {
    format!("\nExported {} rows to {}", rows, path.display())
}
