use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::db::DbPool;
use crate::errors::AppError;
use crate::ident;
use crate::models::aggregate::{self, ResponseFilter};
use crate::models::response::{self, SubmitterInfo};

/// POST /forms/{id}/submit - Append a response.
///
/// The body is stored exactly as submitted (either answers shape). The form
/// is deliberately not checked for existence: a response may reference a
/// form that was deleted, or never existed.
pub async fn submit(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<Value>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    let conn = pool.get()?;

    let submitter = SubmitterInfo {
        ip: req.peer_addr().map(|addr| addr.ip().to_string()),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    let submitter = (submitter.ip.is_some() || submitter.user_agent.is_some()).then_some(submitter);

    response::insert(&conn, &form_id, &body, submitter.as_ref())?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Response submitted" })))
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    action: Option<String>,
}

/// GET /forms/{id}/responses - Raw response listing by default;
/// `?action=stats` switches to quick statistics, `?action=grouped` to the
/// grouped-by-question view.
pub async fn listing(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    if !ident::is_valid(&form_id) {
        return Err(AppError::InvalidInput("Invalid form ID".to_string()));
    }
    let conn = pool.get()?;

    match query.action.as_deref() {
        Some("stats") => Ok(HttpResponse::Ok().json(aggregate::quick_stats(&conn, &form_id)?)),
        Some("grouped") => {
            Ok(HttpResponse::Ok().json(aggregate::grouped_by_question(&conn, &form_id)?))
        }
        _ => Ok(HttpResponse::Ok().json(aggregate::list_responses(
            &conn,
            &form_id,
            &ResponseFilter::default(),
        )?)),
    }
}

/// POST /forms/{id}/responses - Raw response listing with a JSON filter
/// body: {dateFrom, dateTo, limit, offset, statisticsOnly}.
pub async fn listing_filtered(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    body: web::Json<ResponseFilter>,
) -> Result<HttpResponse, AppError> {
    let form_id = path.into_inner();
    if !ident::is_valid(&form_id) {
        return Err(AppError::InvalidInput("Invalid form ID".to_string()));
    }
    let conn = pool.get()?;
    Ok(HttpResponse::Ok().json(aggregate::list_responses(&conn, &form_id, &body)?))
}
