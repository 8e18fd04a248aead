//! Handler-level tests — the JSON API surface wired the same way main()
//! wires it:
//! - CRUD over /forms with the JSON error body shape
//! - Submit + listing round-trip, action switches
//! - The save-by-body-id behavior of PUT
//! - Multipart upload and streamed download
//! - Generation without an API key

mod common;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use serde_json::{Value, json};

use common::setup_test_pool;
use formbase::assistant::Assistant;
use formbase::blob::BlobStore;
use formbase::db::DbPool;
use formbase::{errors, handlers};
use tempfile::TempDir;

fn test_state() -> (TempDir, DbPool, BlobStore, Assistant) {
    let (dir, pool) = setup_test_pool();
    let blob = BlobStore::open(dir.path().join("uploads")).expect("open blob store");
    let assistant = Assistant::new(None, "http://127.0.0.1:1/unused");
    (dir, pool, blob, assistant)
}

macro_rules! test_app {
    ($pool:expr, $blob:expr, $assistant:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new($blob.clone()))
                .app_data(web::Data::new($assistant.clone()))
                .app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
                .configure(handlers::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_create_and_list_forms() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms")
        .set_json(json!({ "title": "Feedback", "questions": [] }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["title"], json!("Feedback"));
    let id = created["_id"].as_str().expect("id").to_string();
    assert_eq!(id.len(), 24);

    let req = test::TestRequest::get().uri("/forms").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    let forms = listed.as_array().expect("array");
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0]["_id"], json!(id));
}

#[actix_web::test]
async fn test_create_applies_defaults() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms")
        .set_json(json!({}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["title"], json!("Untitled Form"));
    assert_eq!(created["description"], json!(""));
    assert_eq!(created["questions"], json!([]));
}

#[actix_web::test]
async fn test_get_unknown_form_is_404_with_error_body() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::get()
        .uri("/forms/0123456789abcdef01234567")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Form not found"));
}

#[actix_web::test]
async fn test_malformed_form_id_is_400() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::get().uri("/forms/not-an-id").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Invalid form ID"));
}

#[actix_web::test]
async fn test_put_targets_body_id_not_path() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms")
        .set_json(json!({ "title": "Path Target" }))
        .to_request();
    let path_form: Value = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post()
        .uri("/forms")
        .set_json(json!({ "title": "Body Target" }))
        .to_request();
    let body_form: Value = test::call_and_read_body_json(&app, req).await;

    // PUT to the path of one form, with the other form's id in the body:
    // the body id wins.
    let req = test::TestRequest::put()
        .uri(&format!("/forms/{}", path_form["_id"].as_str().unwrap()))
        .set_json(json!({
            "_id": body_form["_id"],
            "title": "Renamed via body id"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/forms/{}", body_form["_id"].as_str().unwrap()))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["title"], json!("Renamed via body id"));

    let req = test::TestRequest::get()
        .uri(&format!("/forms/{}", path_form["_id"].as_str().unwrap()))
        .to_request();
    let untouched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(untouched["title"], json!("Path Target"));
}

#[actix_web::test]
async fn test_put_without_body_id_is_400() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::put()
        .uri("/forms/0123456789abcdef01234567")
        .set_json(json!({ "title": "No id" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_submit_and_listing_round_trip() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms")
        .set_json(json!({
            "title": "Survey",
            "questions": [
                { "id": "q1", "type": "radio", "label": "Pick", "isRequired": false,
                  "options": ["A", "B"] }
            ]
        }))
        .to_request();
    let form: Value = test::call_and_read_body_json(&app, req).await;
    let form_id = form["_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/forms/{form_id}/submit"))
        .set_json(json!({ "q1": "A" }))
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(submitted["message"], json!("Response submitted"));

    let req = test::TestRequest::get()
        .uri(&format!("/forms/{form_id}/responses"))
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["totalResponses"], json!(1));
    assert_eq!(listing["formTitle"], json!("Survey"));
    let answers = &listing["responses"][0]["answers"];
    assert_eq!(answers[0]["value"], json!("A"));
    assert_eq!(answers[0]["questionType"], json!("radio"));

    let req = test::TestRequest::get()
        .uri(&format!("/forms/{form_id}/responses?action=stats"))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["totalSubmissions"], json!(1));
    assert_eq!(stats["numberOfQuestions"], json!(1));

    let req = test::TestRequest::get()
        .uri(&format!("/forms/{form_id}/responses?action=grouped"))
        .to_request();
    let grouped: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(grouped.as_array().expect("array").len(), 1);
    assert_eq!(grouped[0]["questionId"], json!("q1"));

    let req = test::TestRequest::post()
        .uri(&format!("/forms/{form_id}/responses"))
        .set_json(json!({ "statisticsOnly": true }))
        .to_request();
    let filtered: Value = test::call_and_read_body_json(&app, req).await;
    assert!(filtered.get("responses").is_none());
    assert_eq!(
        filtered["questionStatistics"][0]["statistics"]["A"]["count"],
        json!(1)
    );
}

#[actix_web::test]
async fn test_upload_then_download() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let boundary = "------------------------formbase";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"formId\"\r\n\r\n\
         0123456789abcdef01234567\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"questionId\"\r\n\r\n\
         q1\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"hello.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         hello world\r\n\
         --{boundary}--\r\n"
    );
    let req = test::TestRequest::post()
        .uri("/forms/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let uploaded: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(uploaded["success"], json!(true));
    assert_eq!(uploaded["filename"], json!("hello.txt"));
    assert_eq!(uploaded["size"], json!(11));
    let file_id = uploaded["fileId"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/forms/download/{file_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("private, max-age=3600")
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"hello world");

    let req = test::TestRequest::get()
        .uri("/forms/0123456789abcdef01234567/files/q1")
        .to_request();
    let files: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(files["count"], json!(1));
    assert_eq!(files["files"][0]["originalName"], json!("hello.txt"));
}

#[actix_web::test]
async fn test_upload_without_file_is_400() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let boundary = "------------------------formbase";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"formId\"\r\n\r\n\
         0123456789abcdef01234567\r\n\
         --{boundary}--\r\n"
    );
    let req = test::TestRequest::post()
        .uri("/forms/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], json!("No file provided"));
}

#[actix_web::test]
async fn test_generate_without_api_key_is_401() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms/generate")
        .set_json(json!({ "prompt": "A customer feedback form" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], json!("Claude API key not configured"));
}

#[actix_web::test]
async fn test_generate_without_prompt_is_400() {
    let (_dir, pool, blob, assistant) = test_state();
    let app = test_app!(pool, blob, assistant);

    let req = test::TestRequest::post()
        .uri("/forms/generate")
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
