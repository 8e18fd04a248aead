use chrono::SecondsFormat;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::ident;

/// A file reference carried inside an answer value. Points weakly at a
/// stored file by id; deleting the file does not touch the response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub file_id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub uploaded_at: String,
}

/// One submitted value. Submissions are schemaless, so this is an untagged
/// union over the shapes the platform produces: a string (short/paragraph/
/// radio), a list of strings (checkbox), a list of file descriptors (file),
/// with anything else preserved verbatim in `Other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Selections(Vec<String>),
    Uploads(Vec<FileUpload>),
    Other(Value),
}

impl AnswerValue {
    /// Whether this value counts as answered: null and the empty string are
    /// filtered, but an empty selection list passes through (a deliberately
    /// unchecked checkbox group serializes to an empty array).
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Text(s) => !s.is_empty(),
            AnswerValue::Selections(_) | AnswerValue::Uploads(_) => true,
            AnswerValue::Other(v) => !v.is_null(),
        }
    }
}

impl From<Value> for AnswerValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => AnswerValue::Text(s),
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    AnswerValue::Selections(
                        items
                            .into_iter()
                            .filter_map(|item| match item {
                                Value::String(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    match serde_json::from_value::<Vec<FileUpload>>(Value::Array(items.clone())) {
                        Ok(uploads) => AnswerValue::Uploads(uploads),
                        Err(_) => AnswerValue::Other(Value::Array(items)),
                    }
                }
            }
            other => AnswerValue::Other(other),
        }
    }
}

/// One question's answer within a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub value: AnswerValue,
}

/// The wire shape of a response's answers. Two representations exist in
/// stored data: an ordered array of {questionId, value} pairs, and a map
/// from questionId to value. Readers accept both and normalize to the pair
/// list before anything downstream sees the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerSheet {
    Pairs(Vec<Answer>),
    Map(serde_json::Map<String, Value>),
    /// Anything else stored in the answers slot normalizes to no answers.
    Other(Value),
}

impl AnswerSheet {
    pub fn into_answers(self) -> Vec<Answer> {
        match self {
            AnswerSheet::Pairs(answers) => answers,
            AnswerSheet::Map(map) => map
                .into_iter()
                .map(|(question_id, value)| Answer {
                    question_id,
                    value: AnswerValue::from(value),
                })
                .collect(),
            AnswerSheet::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitterInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// A stored submission with its answers normalized to the pair list.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(rename = "_id")]
    pub id: String,
    pub form_id: String,
    pub answers: Vec<Answer>,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_info: Option<SubmitterInfo>,
}

fn row_to_response(row: &rusqlite::Row) -> Result<Response, AppError> {
    let answers_json: String = row.get("answers")?;
    let sheet: AnswerSheet = serde_json::from_str(&answers_json)?;
    let submitter_json: Option<String> = row.get("submitter_info")?;
    let submitter_info = match submitter_json {
        Some(json) => serde_json::from_str(&json)?,
        None => None,
    };
    Ok(Response {
        id: row.get("id")?,
        form_id: row.get("form_id")?,
        answers: sheet.into_answers(),
        submitted_at: row.get("submitted_at")?,
        submitter_info,
    })
}

/// Insert a submission at an explicit timestamp (RFC 3339 UTC). The answers
/// value is stored exactly as submitted, in whichever shape it arrived.
pub fn insert_at(
    conn: &Connection,
    form_id: &str,
    answers: &Value,
    submitter_info: Option<&SubmitterInfo>,
    submitted_at: &str,
) -> Result<String, AppError> {
    let id = ident::generate();
    let submitter_json = match submitter_info {
        Some(info) => Some(serde_json::to_string(info)?),
        None => None,
    };
    conn.execute(
        "INSERT INTO responses (id, form_id, answers, submitted_at, submitter_info) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            form_id,
            serde_json::to_string(answers)?,
            submitted_at,
            submitter_json
        ],
    )?;
    Ok(id)
}

/// Insert a submission timestamped now. Responses are append-only: no
/// exposed operation mutates or deletes them.
pub fn insert(
    conn: &Connection,
    form_id: &str,
    answers: &Value,
    submitter_info: Option<&SubmitterInfo>,
) -> Result<String, AppError> {
    let now = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    insert_at(conn, form_id, answers, submitter_info, &now)
}

/// Fetch a form's responses sorted by submission time descending, optionally
/// bounded to an inclusive [date_from, date_to] window. Bounds are RFC 3339
/// UTC strings; comparison is lexicographic, which matches chronological
/// order for that format.
pub fn find_by_form(
    conn: &Connection,
    form_id: &str,
    date_from: Option<&str>,
    date_to: Option<&str>,
) -> Result<Vec<Response>, AppError> {
    let mut sql = String::from(
        "SELECT id, form_id, answers, submitted_at, submitter_info \
         FROM responses WHERE form_id = ?1",
    );
    let mut bind: Vec<&str> = vec![form_id];
    if let Some(from) = date_from {
        sql.push_str(" AND submitted_at >= ?");
        sql.push_str(&(bind.len() + 1).to_string());
        bind.push(from);
    }
    if let Some(to) = date_to {
        sql.push_str(" AND submitted_at <= ?");
        sql.push_str(&(bind.len() + 1).to_string());
        bind.push(to);
    }
    sql.push_str(" ORDER BY submitted_at DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(bind.iter()))?;
    let mut responses = Vec::new();
    while let Some(row) = rows.next()? {
        responses.push(row_to_response(row)?);
    }
    Ok(responses)
}

/// Count a form's responses.
pub fn count_by_form(conn: &Connection, form_id: &str) -> Result<i64, AppError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM responses WHERE form_id = ?1",
        params![form_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
