use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;

use crate::errors::AppError;
use crate::ident;
use crate::models::form::{Question, QuestionType};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

const SYSTEM_PROMPT: &str = r#"You are a form generation assistant. Generate a form based on the user's description. You must respond with a valid JSON object that matches this exact structure:

{
  "title": "Form Title",
  "description": "Optional form description",
  "questions": [
    {
      "id": "unique-id",
      "type": "short" | "paragraph" | "radio" | "checkbox" | "file",
      "label": "Question text",
      "isRequired": true | false,
      "options": ["option1", "option2"] // only for radio/checkbox types
      "acceptedFileTypes": [".pdf", ".doc"] // only for file type (optional)
      "maxFileSize": 10485760 // only for file type in bytes (optional, default 10MB)
    }
  ]
}

Rules:
1. Generate between 3-10 questions unless specified otherwise
2. Use appropriate question types based on the context
3. Make logical questions required or optional
4. For radio/checkbox questions, provide 2-6 relevant options
5. For file upload questions, suggest appropriate file types and size limits
6. Use descriptive labels and clear question text
7. Ensure all IDs are unique
8. Return ONLY the JSON object, no additional text or markdown
9. Make sure the JSON is valid and properly formatted

Question Types:
- "short": Single line text input
- "paragraph": Multi-line text input
- "radio": Single choice from options
- "checkbox": Multiple choice from options
- "file": File upload with optional restrictions"#;

/// A normalized form skeleton ready for the create operation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedForm {
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<OutboundMessage<'a>>,
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Clone)]
pub struct Assistant {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl Assistant {
    pub fn new(api_key: Option<String>, api_url: impl Into<String>) -> Self {
        Assistant {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            api_url: api_url.into(),
        }
    }

    /// Read the API key from `ANTHROPIC_API_KEY`; a missing key surfaces as
    /// an auth-misconfiguration error on first use, not at startup.
    pub fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        if api_key.as_deref().is_none_or(str::is_empty) {
            log::warn!("ANTHROPIC_API_KEY not set; form generation will be unavailable");
        }
        Assistant::new(api_key, MESSAGES_URL)
    }

    pub async fn generate(&self, prompt: &str) -> Result<GeneratedForm, AppError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::UpstreamAuth("Claude API key not configured".to_string())
        })?;

        let request = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT,
            messages: vec![OutboundMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Text generation service unreachable: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::UpstreamAuth(
                "Authentication failed. Please check Claude API configuration.".to_string(),
            ));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::UpstreamRateLimited(
                "Rate limit exceeded. Please try again later.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Text generation request failed with status {status}"
            )));
        }

        let message: MessagesResponse = response.json().await.map_err(|_| {
            AppError::Upstream("Failed to parse AI response. Please try again.".to_string())
        })?;
        let text = message
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AppError::Upstream(
                "No response received from text generation service".to_string(),
            ));
        }

        parse_generated(text)
    }
}

/// Parse and normalize the model's reply into a form skeleton. Public so the
/// normalization rules are testable without a network.
pub fn parse_generated(text: &str) -> Result<GeneratedForm, AppError> {
    // The model is told to return bare JSON but sometimes wraps it in
    // markdown fences anyway.
    let cleaned = text
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    let raw: Value = serde_json::from_str(&cleaned).map_err(|_| {
        AppError::Upstream("Failed to parse AI response. Please try again.".to_string())
    })?;

    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let questions = raw.get("questions").and_then(Value::as_array);
    let (Some(questions), false) = (questions, title.is_empty()) else {
        return Err(AppError::Upstream(
            "Failed to generate form. Please try again.".to_string(),
        ));
    };

    let description = raw
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(GeneratedForm {
        title,
        description,
        questions: normalize_questions(questions),
    })
}

/// Normalize generated questions: fill missing ids and labels, de-duplicate
/// ids, coerce invalid types to `short`, and keep the optional fields only
/// when they have the expected shape.
pub fn normalize_questions(raw: &[Value]) -> Vec<Question> {
    let mut used_ids: HashSet<String> = HashSet::new();

    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            let obj = value.as_object().cloned().unwrap_or_default();

            let mut id = obj
                .get("id")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("question-{}", index + 1));
            if used_ids.contains(&id) {
                id = format!("question-{}", ident::generate());
            }
            used_ids.insert(id.clone());

            let question_type = obj
                .get("type")
                .and_then(Value::as_str)
                .and_then(|t| serde_json::from_value::<QuestionType>(json!(t)).ok())
                .filter(|t| *t != QuestionType::Unknown)
                .unwrap_or(QuestionType::Short);

            let label = obj
                .get("label")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Question {}", index + 1));

            let is_required = obj
                .get("isRequired")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            Question {
                id,
                question_type,
                label,
                is_required,
                options: string_list(obj.get("options")),
                accepted_file_types: string_list(obj.get("acceptedFileTypes")),
                max_file_size: obj.get("maxFileSize").and_then(Value::as_u64),
            }
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
