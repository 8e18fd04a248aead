//! Shared test infrastructure: temporary databases and fixture builders.

#![allow(dead_code)]

use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

use formbase::db::{self, DbPool, MIGRATIONS};
use formbase::models::form::{self, Form, NewForm, Question, QuestionType};
use formbase::models::response;

/// Open a temporary SQLite database with the schema applied.
///
/// Returns (TempDir, Connection); the TempDir must be kept alive for the
/// Connection to remain valid.
pub fn setup_test_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let conn = Connection::open(&db_path).expect("Failed to open test DB");

    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")
        .expect("Failed to set pragmas");
    conn.execute_batch(MIGRATIONS)
        .expect("Failed to run migrations");

    (dir, conn)
}

/// Pool-backed variant for handler-level tests.
pub fn setup_test_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().expect("utf-8 path"));
    db::run_migrations(&pool);
    (dir, pool)
}

pub fn text_question(id: &str, label: &str) -> Question {
    Question {
        id: id.to_string(),
        question_type: QuestionType::Short,
        label: label.to_string(),
        is_required: false,
        options: None,
        accepted_file_types: None,
        max_file_size: None,
    }
}

pub fn choice_question(
    id: &str,
    label: &str,
    question_type: QuestionType,
    options: &[&str],
) -> Question {
    Question {
        id: id.to_string(),
        question_type,
        label: label.to_string(),
        is_required: false,
        options: Some(options.iter().map(|s| s.to_string()).collect()),
        accepted_file_types: None,
        max_file_size: None,
    }
}

/// Create a form with the given questions and return the stored document.
pub fn create_form(conn: &Connection, title: &str, questions: Vec<Question>) -> Form {
    form::create(
        conn,
        NewForm {
            title: Some(title.to_string()),
            description: None,
            questions: Some(questions),
        },
    )
    .expect("Failed to create form")
}

/// Submit a response at an explicit timestamp.
pub fn submit_at(conn: &Connection, form_id: &str, answers: Value, submitted_at: &str) -> String {
    response::insert_at(conn, form_id, &answers, None, submitted_at)
        .expect("Failed to insert response")
}
