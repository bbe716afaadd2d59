//! End-to-end request cycles against a scripted completion service.

use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use rusqlite::Connection;
use sql_query_generator::{
    app::{FailureKind, Pipeline, RequestOutcome, RequestStage, RunOutcome},
    error::{AppResult, llm_api_error},
    executor::{CellValue, ExecutionResult},
    llm::{CompletionService, ModelClient, ModelSettings, select_fallback}
};
use tempfile::TempDir;

/// Answers per model; models without an answer fail
struct ScriptedService {
    answers: HashMap<&'static str, &'static str>,
    models:  Vec<String>,
    calls:   Mutex<Vec<String>>
}

impl ScriptedService {
    fn new(answers: &[(&'static str, &'static str)], models: &[&str]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            models:  models.iter().map(|m| m.to_string()).collect(),
            calls:   Mutex::new(Vec::new())
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionService for ScriptedService {
    async fn complete(&self, model: &str, _prompt: &str) -> AppResult<String> {
        self.calls.lock().unwrap().push(model.to_string());
        self.answers
            .get(model)
            .map(|answer| answer.to_string())
            .ok_or_else(|| llm_api_error(format!("model '{}' not found", model)))
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(self.models.clone())
    }
}

fn movies_db(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("movies.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE director(id INTEGER, name TEXT, birth_year INTEGER);
             INSERT INTO director VALUES (1, 'Christopher Nolan', 1970);
             INSERT INTO director VALUES (2, 'Greta Gerwig', 1983);
             INSERT INTO director VALUES (3, 'Wong Kar-wai', 1958);"
        )
        .unwrap();
    path
}

fn pipeline(
    dir: &TempDir,
    service: ScriptedService,
    fallback_models: Vec<String>
) -> Pipeline<ScriptedService> {
    let client = ModelClient::new(
        service,
        ModelSettings {
            model: "gemini-1.5-flash".into(),
            family: "gemini".into(),
            fallback_models
        }
    );
    Pipeline::new(movies_db(dir), client)
}

#[tokio::test]
async fn test_directors_born_before_1980() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(
        &[(
            "gemini-1.5-flash",
            "```sql\nSELECT * FROM director WHERE birth_year < 1980;\n```"
        )],
        &[]
    );
    let pipeline = pipeline(&dir, service, Vec::new());

    let outcome = pipeline.ask("Select all directors born before 1980").await;
    assert_eq!(outcome.stage(), RequestStage::Executed);
    assert!(outcome.is_success());

    let generated = outcome.generated().unwrap();
    assert_eq!(generated.sql, "SELECT * FROM director WHERE birth_year < 1980;");
    assert_eq!(generated.model, "gemini-1.5-flash");

    let RequestOutcome::Completed {
        outcome: RunOutcome::Executed {
            result, ..
        },
        ..
    } = outcome
    else {
        panic!("expected executed outcome");
    };
    let rows = result.rows().unwrap();
    let names: Vec<&CellValue> = rows.rows().iter().map(|row| &row[1]).collect();
    assert_eq!(
        names,
        [
            &CellValue::Text("Christopher Nolan".into()),
            &CellValue::Text("Wong Kar-wai".into())
        ]
    );
}

#[tokio::test]
async fn test_fallback_to_listed_family_model() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(
        &[("models/gemini-2.0-flash", "SELECT COUNT(*) FROM director")],
        &["models/embedding-001", "models/gemini-2.0-flash", "models/gemini-1.5-pro"]
    );
    let pipeline = pipeline(&dir, service, Vec::new());

    let generated = pipeline.generate("how many directors").await.unwrap();
    assert_eq!(generated.model, "models/gemini-2.0-flash");
    assert_eq!(
        pipeline.client().service().calls(),
        ["gemini-1.5-flash", "models/gemini-2.0-flash"]
    );
}

#[tokio::test]
async fn test_pinned_fallback_skips_listing() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(
        &[("gemini-1.5-pro", "SELECT name FROM director")],
        &["models/gemini-2.0-flash"]
    );
    let pipeline = pipeline(&dir, service, vec!["gemini-1.5-pro".into()]);

    let outcome = pipeline.ask("list director names").await;
    assert_eq!(outcome.stage(), RequestStage::Executed);
    assert_eq!(outcome.generated().unwrap().model, "gemini-1.5-pro");
}

#[tokio::test]
async fn test_no_family_model_is_generation_failure() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(&[], &["models/embedding-001", "gemini-1.5-flash"]);
    let pipeline = pipeline(&dir, service, Vec::new());

    let outcome = pipeline.ask("how many directors").await;
    assert_eq!(outcome.stage(), RequestStage::Failed(FailureKind::Generation));
    let RequestOutcome::GenerationFailed {
        message
    } = outcome
    else {
        panic!("expected generation failure");
    };
    assert!(message.contains("No gemini models available"));
    assert_eq!(pipeline.client().service().calls(), ["gemini-1.5-flash"]);
}

#[tokio::test]
async fn test_fallback_failure_is_single_retry() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(&[], &["gemini-2.0-flash", "gemini-1.5-pro"]);
    let pipeline = pipeline(&dir, service, Vec::new());

    assert!(pipeline.generate("how many directors").await.is_err());
    assert_eq!(
        pipeline.client().service().calls(),
        ["gemini-1.5-flash", "gemini-2.0-flash"]
    );
}

#[tokio::test]
async fn test_write_statement_is_acknowledged() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(
        &[(
            "gemini-1.5-flash",
            "`INSERT INTO director VALUES (4, 'Céline Sciamma', 1978)`"
        )],
        &[]
    );
    let pipeline = pipeline(&dir, service, Vec::new());

    let outcome = pipeline.ask("add Céline Sciamma, born 1978").await;
    assert_eq!(outcome.stage(), RequestStage::Executed);
    let RequestOutcome::Completed {
        outcome: RunOutcome::Executed {
            result, ..
        },
        ..
    } = outcome
    else {
        panic!("expected executed outcome");
    };
    assert!(matches!(
        result,
        ExecutionResult::Acknowledged(ref ack) if ack.rows_affected == 1
    ));

    let RunOutcome::Executed {
        result, ..
    } = pipeline.run("SELECT COUNT(*) FROM director")
    else {
        panic!("expected executed outcome");
    };
    assert_eq!(result.rows().unwrap().rows()[0][0], CellValue::Integer(4));
}

#[tokio::test]
async fn test_prose_answer_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = ScriptedService::new(
        &[("gemini-1.5-flash", "Sorry, I can only help with movies.")],
        &[]
    );
    let pipeline = pipeline(&dir, service, Vec::new());

    let outcome = pipeline.ask("what's the weather").await;
    assert_eq!(outcome.stage(), RequestStage::Rejected);
    assert!(!outcome.is_success());
}

#[test]
fn test_select_fallback_order() {
    let models: Vec<String> = ["gpt-4", "Gemini-Pro", "gemini-1.5-flash"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(
        select_fallback(&models, "gemini", "gemini-1.5-flash").as_deref(),
        Some("Gemini-Pro")
    );
    assert_eq!(select_fallback(&models, "claude", "gpt-4"), None);
}
