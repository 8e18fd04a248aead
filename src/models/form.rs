use chrono::SecondsFormat;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::ident;

/// The fixed question type enumeration. Wire names match the stored
/// documents; `Unknown` is the sentinel used when an answer references a
/// question that no longer exists, and the fallback for corrupt stored types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Short,
    Paragraph,
    Radio,
    Checkbox,
    File,
    #[serde(other)]
    Unknown,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Short => "short",
            QuestionType::Paragraph => "paragraph",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::File => "file",
            QuestionType::Unknown => "unknown",
        }
    }

    /// Choice types carry an options list and get a statistics block.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Checkbox)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    #[serde(default)]
    pub is_required: bool,
    /// Ordered selectable labels for radio/checkbox. Order is preserved for
    /// display and for statistics keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// File questions only: extension/MIME patterns, e.g. [".pdf", ".jpg"].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_file_types: Option<Vec<String>>,
    /// File questions only: advisory maximum size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
}

/// A stored form document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
}

/// Create-form input; missing fields get defaults on insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

/// Save-form input. The target id comes from the body's `_id`, not the URL
/// path (callers depend on this). Fields left out keep their stored value.
#[derive(Debug, Clone, Deserialize)]
pub struct FormUpdate {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<Question>>,
}

fn row_to_form(row: &rusqlite::Row) -> Result<Form, AppError> {
    let questions_json: String = row.get("questions")?;
    Ok(Form {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        questions: serde_json::from_str(&questions_json)?,
        created_at: row.get("created_at")?,
    })
}

/// List all forms, most recent first.
pub fn find_all(conn: &Connection) -> Result<Vec<Form>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, questions, created_at \
         FROM forms ORDER BY created_at DESC, rowid DESC",
    )?;
    let mut forms = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        forms.push(row_to_form(row)?);
    }
    Ok(forms)
}

/// Find a single form by id.
pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Form>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, questions, created_at FROM forms WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_form(row)?)),
        None => Ok(None),
    }
}

/// Insert a new form document, applying defaults for missing fields.
/// Returns the stored document with its generated id.
pub fn create(conn: &Connection, new: NewForm) -> Result<Form, AppError> {
    let form = Form {
        id: ident::generate(),
        title: new.title.unwrap_or_else(|| "Untitled Form".to_string()),
        description: new.description.unwrap_or_default(),
        questions: new.questions.unwrap_or_default(),
        created_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    conn.execute(
        "INSERT INTO forms (id, title, description, questions, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            form.id,
            form.title,
            form.description,
            serde_json::to_string(&form.questions)?,
            form.created_at
        ],
    )?;
    Ok(form)
}

/// Replace a form document. Returns false when no document matched the id.
pub fn update(conn: &Connection, id: &str, update: FormUpdate) -> Result<bool, AppError> {
    let Some(existing) = find_by_id(conn, id)? else {
        return Ok(false);
    };

    let title = update.title.unwrap_or(existing.title);
    let description = update.description.unwrap_or(existing.description);
    let questions = update.questions.unwrap_or(existing.questions);

    conn.execute(
        "UPDATE forms SET title = ?1, description = ?2, questions = ?3 WHERE id = ?4",
        params![title, description, serde_json::to_string(&questions)?, id],
    )?;
    Ok(true)
}

/// Delete a form by id. Returns false when nothing was deleted.
/// Responses and stored files referencing the form are left in place.
pub fn delete(conn: &Connection, id: &str) -> Result<bool, AppError> {
    let affected = conn.execute("DELETE FROM forms WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

/// Count a form's questions without materializing the whole document list.
pub fn question_count(conn: &Connection, id: &str) -> Result<Option<usize>, AppError> {
    let questions_json: Option<String> = conn
        .query_row(
            "SELECT questions FROM forms WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    match questions_json {
        Some(json) => {
            let questions: Vec<Question> = serde_json::from_str(&json)?;
            Ok(Some(questions.len()))
        }
        None => Ok(None),
    }
}
