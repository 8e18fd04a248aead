//! Read-only aggregation over a form's responses: quick counts, the raw
//! enriched listing, the grouped-by-question view, and per-option
//! distributions for choice questions. Nothing here mutates stored state.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::errors::AppError;
use crate::models::form::{self, Form, Question, QuestionType};
use crate::models::response::{self, AnswerValue, Response};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub total_submissions: i64,
    pub number_of_questions: usize,
}

/// An answer enriched with its originating question's type. Answers whose
/// questionId no longer matches any question get the `unknown` sentinel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAnswer {
    pub question_id: String,
    pub question_type: QuestionType,
    pub value: AnswerValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub form_id: String,
    pub answers: Vec<EnrichedAnswer>,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupedAnswer {
    pub response_id: String,
    pub question_type: QuestionType,
    pub value: AnswerValue,
    pub submitted_at: String,
}

/// One record per question, in form-definition order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswers {
    pub question_id: String,
    pub question_label: String,
    pub question_type: QuestionType,
    pub answers: Vec<GroupedAnswer>,
}

/// Per-question totals, plus an option distribution for choice questions.
/// The statistics map is keyed by declared option, in declared order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatistics {
    pub question_id: String,
    pub question_label: String,
    pub question_type: QuestionType,
    pub total_answers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Map<String, Value>>,
}

/// Listing filters. Date bounds are inclusive on the submission timestamp;
/// limit/offset paginate after the descending sort; statisticsOnly drops the
/// response page from the output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFilter {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub statistics_only: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseListing {
    pub form_id: String,
    pub form_title: String,
    /// Matching count before pagination.
    pub total_responses: i64,
    /// Computed over the full (time-filtered, pre-pagination) matching set.
    pub question_statistics: Vec<QuestionStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<EnrichedResponse>>,
}

/// Total response count and question count for a form.
pub fn quick_stats(conn: &Connection, form_id: &str) -> Result<QuickStats, AppError> {
    let number_of_questions =
        form::question_count(conn, form_id)?.ok_or(AppError::NotFound("Form"))?;
    let total_submissions = response::count_by_form(conn, form_id)?;
    Ok(QuickStats {
        total_submissions,
        number_of_questions,
    })
}

/// Normalize a filter bound to the stored RFC 3339 UTC millisecond format.
/// Accepts a full timestamp or a bare date; a bare date expands to the start
/// (dateFrom) or end (dateTo) of that day, keeping both bounds inclusive.
fn normalize_bound(raw: &str, end_of_day: bool) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(_) if end_of_day => Ok(format!("{trimmed}T23:59:59.999Z")),
        Ok(_) => Ok(format!("{trimmed}T00:00:00.000Z")),
        Err(_) => Err(AppError::InvalidInput(format!(
            "Invalid date filter: {trimmed}"
        ))),
    }
}

fn lookup_type(questions: &[Question], question_id: &str) -> QuestionType {
    questions
        .iter()
        .find(|q| q.id == question_id)
        .map(|q| q.question_type)
        .unwrap_or(QuestionType::Unknown)
}

/// Raw response listing: the form's responses in descending submission
/// order, each answer enriched with its question type, alongside the
/// pre-pagination total and the per-question statistics block.
pub fn list_responses(
    conn: &Connection,
    form_id: &str,
    filter: &ResponseFilter,
) -> Result<ResponseListing, AppError> {
    let form = form::find_by_id(conn, form_id)?.ok_or(AppError::NotFound("Form"))?;

    let date_from = filter
        .date_from
        .as_deref()
        .map(|raw| normalize_bound(raw, false))
        .transpose()?;
    let date_to = filter
        .date_to
        .as_deref()
        .map(|raw| normalize_bound(raw, true))
        .transpose()?;

    let responses =
        response::find_by_form(conn, form_id, date_from.as_deref(), date_to.as_deref())?;
    let total_responses = responses.len() as i64;
    let question_statistics = question_statistics(&form, &responses);

    let responses = if filter.statistics_only {
        None
    } else {
        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Some(
            responses
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|r| EnrichedResponse {
                    id: r.id,
                    form_id: r.form_id,
                    answers: r
                        .answers
                        .into_iter()
                        .map(|a| EnrichedAnswer {
                            question_type: lookup_type(&form.questions, &a.question_id),
                            question_id: a.question_id,
                            value: a.value,
                        })
                        .collect(),
                    submitted_at: r.submitted_at,
                })
                .collect(),
        )
    };

    Ok(ResponseListing {
        form_id: form.id,
        form_title: form.title,
        total_responses,
        question_statistics,
        responses,
    })
}

/// Group every response's answers under the form's questions. Output order
/// is the form's question order; answer order within a question follows the
/// response sort (descending submission time). Absent, null and empty-string
/// values are skipped; an empty selection list passes through.
pub fn grouped_by_question(
    conn: &Connection,
    form_id: &str,
) -> Result<Vec<QuestionAnswers>, AppError> {
    let form = form::find_by_id(conn, form_id)?.ok_or(AppError::NotFound("Form"))?;
    let responses = response::find_by_form(conn, form_id, None, None)?;

    let grouped = form
        .questions
        .iter()
        .map(|question| {
            let answers = responses
                .iter()
                .filter_map(|r| {
                    let answer = r.answers.iter().find(|a| a.question_id == question.id)?;
                    if !answer.value.is_answered() {
                        return None;
                    }
                    Some(GroupedAnswer {
                        response_id: r.id.clone(),
                        question_type: question.question_type,
                        value: answer.value.clone(),
                        submitted_at: r.submitted_at.clone(),
                    })
                })
                .collect();
            QuestionAnswers {
                question_id: question.id.clone(),
                question_label: question.label.clone(),
                question_type: question.question_type,
                answers,
            }
        })
        .collect();

    Ok(grouped)
}

/// Per-question statistics over a form's responses, loaded fresh.
pub fn question_statistics_for_form(
    conn: &Connection,
    form_id: &str,
) -> Result<Vec<QuestionStatistics>, AppError> {
    let form = form::find_by_id(conn, form_id)?.ok_or(AppError::NotFound("Form"))?;
    let responses = response::find_by_form(conn, form_id, None, None)?;
    Ok(question_statistics(&form, &responses))
}

/// Compute per-question totals and, for choice questions with declared
/// options, the per-option distribution. Every declared option appears even
/// at zero; values outside the declared set are dropped. Percentages are
/// count/totalAnswers x 100, rounded half-away-from-zero at the 2nd decimal;
/// an unanswered question yields all-zero percentages.
pub fn question_statistics(form: &Form, responses: &[Response]) -> Vec<QuestionStatistics> {
    form.questions
        .iter()
        .map(|question| {
            let answered: Vec<&AnswerValue> = responses
                .iter()
                .filter_map(|r| {
                    r.answers
                        .iter()
                        .find(|a| a.question_id == question.id)
                        .map(|a| &a.value)
                })
                .filter(|v| v.is_answered())
                .collect();
            let total_answers = answered.len();

            let statistics = match (&question.options, question.question_type.is_choice()) {
                (Some(options), true) => {
                    Some(option_distribution(question.question_type, options, &answered))
                }
                _ => None,
            };

            QuestionStatistics {
                question_id: question.id.clone(),
                question_label: question.label.clone(),
                question_type: question.question_type,
                total_answers,
                statistics,
            }
        })
        .collect()
}

fn option_distribution(
    question_type: QuestionType,
    options: &[String],
    answered: &[&AnswerValue],
) -> Map<String, Value> {
    let mut counts: Vec<u64> = vec![0; options.len()];
    let index_of = |value: &str| options.iter().position(|opt| opt == value);

    for value in answered {
        match (question_type, value) {
            (QuestionType::Radio, AnswerValue::Text(picked)) => {
                if let Some(i) = index_of(picked) {
                    counts[i] += 1;
                }
            }
            (QuestionType::Checkbox, AnswerValue::Selections(picked)) => {
                for selection in picked {
                    if let Some(i) = index_of(selection) {
                        counts[i] += 1;
                    }
                }
            }
            // Values of the wrong shape for the question type are stray
            // data and fall outside the declared option counts.
            _ => {}
        }
    }

    let total = answered.len();
    let mut stats = Map::new();
    for (option, count) in options.iter().zip(counts) {
        stats.insert(
            option.clone(),
            json!({ "count": count, "percentage": percentage(count, total) }),
        );
    }
    stats
}

fn percentage(count: u64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = count as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
