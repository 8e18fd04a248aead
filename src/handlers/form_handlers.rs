use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::ident;
use crate::models::form::{self, FormUpdate, NewForm};

/// GET /forms - List all forms, most recent first.
pub async fn list(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let forms = form::find_all(&conn)?;
    Ok(HttpResponse::Ok().json(forms))
}

/// POST /forms - Create a form; defaults are applied for missing fields.
pub async fn create(
    pool: web::Data<DbPool>,
    body: web::Json<NewForm>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let created = form::create(&conn, body.into_inner())?;
    Ok(HttpResponse::Ok().json(created))
}

/// GET /forms/{id} - Fetch a single form.
pub async fn read(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    if !ident::is_valid(&form_id) {
        return Err(AppError::InvalidInput("Invalid form ID".to_string()));
    }
    let conn = pool.get()?;
    match form::find_by_id(&conn, &form_id)? {
        Some(found) => Ok(HttpResponse::Ok().json(found)),
        None => Err(AppError::NotFound("Form")),
    }
}

/// PUT /forms/{id} - Replace a form document.
///
/// The target id is read from the body's `_id`, not the URL path. Existing
/// callers send the whole document with its id in the body; the path segment
/// is ignored on purpose.
pub async fn update(
    pool: web::Data<DbPool>,
    _path: web::Path<String>,
    body: web::Json<FormUpdate>,
) -> Result<HttpResponse, AppError> {
    let update = body.into_inner();
    let form_id = update
        .id
        .clone()
        .ok_or_else(|| AppError::InvalidInput("Form ID is required".to_string()))?;
    if !ident::is_valid(&form_id) {
        return Err(AppError::InvalidInput("Invalid form ID".to_string()));
    }
    let conn = pool.get()?;
    if !form::update(&conn, &form_id, update)? {
        return Err(AppError::NotFound("Form"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Form updated" })))
}

/// DELETE /forms/{id} - Delete a form. Responses and uploaded files that
/// reference it are left in place.
pub async fn delete(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    if !ident::is_valid(&form_id) {
        return Err(AppError::InvalidInput("Invalid form ID".to_string()));
    }
    let conn = pool.get()?;
    if !form::delete(&conn, &form_id)? {
        return Err(AppError::NotFound("Form"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Form deleted" })))
}
