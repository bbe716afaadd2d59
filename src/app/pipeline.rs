//! One request cycle: schema, prompt, completion, validation, execution.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{FailureKind, RequestOutcome, RequestStage, RunOutcome};
use crate::{
    error::{AppResult, config_error},
    executor::{ENGINE_DIALECT, execute_query},
    llm::{CompletionService, ModelClient},
    query::GeneratedQuery,
    schema::{SchemaDescription, load_schema},
    validator::validate_with_report
};

/// Sequences the components for requests against one database.
///
/// Holds only immutable configuration; every call opens its own database
/// connections and loads the schema afresh.
pub struct Pipeline<S> {
    database: PathBuf,
    client:   ModelClient<S>
}

impl<S: CompletionService> Pipeline<S> {
    pub fn new(database: impl Into<PathBuf>, client: ModelClient<S>) -> Self {
        Self {
            database: database.into(),
            client
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn client(&self) -> &ModelClient<S> {
        &self.client
    }

    /// Prompt the model would receive for `request`
    pub fn prompt(&self, request: &str) -> AppResult<String> {
        let request = non_empty_request(request)?;
        let schema = self.load_schema()?;
        Ok(self.client.prompt(&schema, request))
    }

    /// Generate SQL for a natural-language request.
    ///
    /// # Errors
    ///
    /// Config error for an empty request, connection error when the schema
    /// cannot be read, generation error when no model answers.
    pub async fn generate(&self, request: &str) -> AppResult<GeneratedQuery> {
        let request = non_empty_request(request)?;
        let schema = self.load_schema()?;
        self.complete(&schema, request).await
    }

    /// Validate `sql` and execute it when valid
    pub fn run(&self, sql: &str) -> RunOutcome {
        run_sql(sql, &self.database)
    }

    /// Full cycle for one request; every failure ends up in the outcome
    pub async fn ask(&self, request: &str) -> RequestOutcome {
        let request = match non_empty_request(request) {
            Ok(request) => request,
            Err(e) => {
                return finish(RequestOutcome::GenerationFailed {
                    message: e.render_message().into_owned()
                });
            }
        };
        let schema = match self.load_schema() {
            Ok(schema) => schema,
            Err(e) => {
                return finish(RequestOutcome::ConnectionFailed {
                    message: e.render_message().into_owned()
                });
            }
        };
        let generated = match self.complete(&schema, request).await {
            Ok(generated) => generated,
            Err(e) => {
                return finish(RequestOutcome::GenerationFailed {
                    message: e.render_message().into_owned()
                });
            }
        };
        let outcome = self.run(&generated.sql);
        finish(RequestOutcome::Completed {
            generated,
            outcome
        })
    }

    fn load_schema(&self) -> AppResult<SchemaDescription> {
        debug!(stage = %RequestStage::Idle, database = %self.database.display(), "request started");
        let schema = load_schema(&self.database).inspect_err(|_| {
            debug!(stage = %RequestStage::Failed(FailureKind::Connection), "request stage");
        })?;
        debug!(
            stage = %RequestStage::SchemaLoaded,
            tables = schema.table_count(),
            "request stage"
        );
        Ok(schema)
    }

    async fn complete(&self, schema: &SchemaDescription, request: &str) -> AppResult<GeneratedQuery> {
        debug!(stage = %RequestStage::PromptSent, "request stage");
        let generated = self.client.generate(schema, request).await.inspect_err(|_| {
            debug!(stage = %RequestStage::Failed(FailureKind::Generation), "request stage");
        })?;
        debug!(
            stage = %RequestStage::ResponseSanitized,
            model = %generated.model,
            "request stage"
        );
        Ok(generated)
    }
}

/// Validate `sql` and, when valid, execute it against `database`
pub fn run_sql(sql: &str, database: &Path) -> RunOutcome {
    let (validation, query) = validate_with_report(sql, ENGINE_DIALECT);
    let outcome = match query {
        Some(query) => {
            debug!(stage = %RequestStage::Validated, kind = %query.query_type(), "request stage");
            let result = execute_query(&query, database);
            RunOutcome::Executed {
                query,
                result
            }
        }
        None => RunOutcome::Rejected {
            sql: sql.to_string(),
            validation
        }
    };
    info!(stage = %outcome.stage(), "request finished");
    outcome
}

fn finish(outcome: RequestOutcome) -> RequestOutcome {
    if !matches!(outcome, RequestOutcome::Completed { .. }) {
        info!(stage = %outcome.stage(), "request finished");
    }
    outcome
}

/// The request itself goes into the prompt untouched
fn non_empty_request(request: &str) -> AppResult<&str> {
    if request.trim().is_empty() {
        return Err(config_error("Request must not be empty"));
    }
    Ok(request)
}
