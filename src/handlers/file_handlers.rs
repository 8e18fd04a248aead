use actix_files::NamedFile;
use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderValue,
};
use actix_web::{HttpRequest, HttpResponse, web};
use futures_util::TryStreamExt;
use serde_json::json;

use crate::blob::{self, BlobStore, NewStoredFile, StoredFile};
use crate::db::DbPool;
use crate::errors::AppError;
use crate::ident;

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Malformed multipart payload: {e}"))
}

async fn read_text_field(field: &mut Field) -> Result<String, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// POST /forms/upload - Store an uploaded file. Multipart fields: `file`
/// (the bytes), `formId` and `questionId` (owner metadata).
pub async fn upload(
    pool: web::Data<DbPool>,
    store: web::Data<BlobStore>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name = String::new();
    let mut mime_type = "application/octet-stream".to_string();
    let mut form_id = String::new();
    let mut question_id = String::new();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let name = field.name().to_string();
        match name.as_str() {
            "file" => {
                if let Some(filename) = field.content_disposition().get_filename() {
                    original_name = filename.to_string();
                }
                if let Some(ct) = field.content_type() {
                    mime_type = ct.to_string();
                }
                let mut buf = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                    buf.extend_from_slice(&chunk);
                }
                file_bytes = Some(buf);
            }
            "formId" => form_id = read_text_field(&mut field).await?,
            "questionId" => question_id = read_text_field(&mut field).await?,
            _ => {
                // Drain and ignore unexpected fields.
                while field.try_next().await.map_err(bad_multipart)?.is_some() {}
            }
        }
    }

    let Some(bytes) = file_bytes else {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    };
    if form_id.is_empty() || question_id.is_empty() {
        return Err(AppError::InvalidInput(
            "formId and questionId are required".to_string(),
        ));
    }

    let conn = pool.get()?;
    let stored = store.store(
        &conn,
        &bytes,
        NewStoredFile {
            form_id,
            question_id,
            original_name: original_name.clone(),
            mime_type: mime_type.clone(),
        },
    )?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "fileId": stored.id,
        "filename": original_name,
        "size": stored.size,
        "mimeType": mime_type,
    })))
}

async fn stream_file(
    req: &HttpRequest,
    meta: StoredFile,
    path: std::path::PathBuf,
) -> Result<HttpResponse, AppError> {
    let file = NamedFile::open_async(&path).await?;
    let mime: mime::Mime = meta
        .mime_type
        .parse()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
    let response = file
        .set_content_type(mime)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(meta.original_name)],
        })
        .into_response(req);
    Ok(response)
}

/// GET /forms/upload/{fileId} - Stream a stored file back as an attachment.
pub async fn fetch(
    pool: web::Data<DbPool>,
    store: web::Data<BlobStore>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let file_id = path.into_inner();
    let conn = pool.get()?;
    let (meta, file_path) = store.retrieve(&conn, &file_id)?;
    stream_file(&req, meta, file_path).await
}

/// GET /forms/download/{fileId} - Same as fetch, with a malformed-id guard
/// and a short private cache window for repeat downloads.
pub async fn download(
    pool: web::Data<DbPool>,
    store: web::Data<BlobStore>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let file_id = path.into_inner();
    if !ident::is_valid(&file_id) {
        return Err(AppError::InvalidInput("Invalid file ID format".to_string()));
    }
    let conn = pool.get()?;
    let (meta, file_path) = store.retrieve(&conn, &file_id)?;
    let mut response = stream_file(&req, meta, file_path).await?;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );
    Ok(response)
}

/// DELETE /forms/upload/{fileId} - Remove a stored file. Idempotent:
/// deleting a file that is already gone still succeeds.
pub async fn delete(
    pool: web::Data<DbPool>,
    store: web::Data<BlobStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let file_id = path.into_inner();
    let conn = pool.get()?;
    store.delete(&conn, &file_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "File deleted successfully",
    })))
}

/// GET /forms/{id}/files/{questionId} - List stored-file metadata for one
/// form/question pair (exact match, no pagination).
pub async fn list_by_question(
    pool: web::Data<DbPool>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (form_id, question_id) = path.into_inner();
    let conn = pool.get()?;
    let files = blob::find_by_owner(&conn, &form_id, &question_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "count": files.len(),
        "files": files,
    })))
}
