use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::assistant::Assistant;
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
}

/// POST /forms/generate - Generate a form skeleton from a natural-language
/// prompt. The result is not persisted; the caller saves it via POST /forms.
pub async fn generate(
    assistant: web::Data<Assistant>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, AppError> {
    let prompt = body
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput("Prompt is required and must be a string".to_string())
        })?;

    let form = assistant.generate(prompt).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "form": form })))
}
