use actix_web::{App, HttpResponse, HttpServer, middleware, web};

use formbase::assistant::Assistant;
use formbase::blob::BlobStore;
use formbase::{db, errors, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let db_path = std::env::var("FORMBASE_DB").unwrap_or_else(|_| "data/formbase.db".to_string());
    let blob_dir =
        std::env::var("FORMBASE_DATA_DIR").unwrap_or_else(|_| "data/uploads".to_string());
    let bind = std::env::var("FORMBASE_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).expect("Failed to create data directory");
        }
    }

    let pool = db::init_pool(&db_path);
    db::run_migrations(&pool);

    let blob = BlobStore::open(&blob_dir).expect("Failed to open blob store");
    let assistant = Assistant::from_env();

    log::info!("Starting server at http://{bind}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(blob.clone()))
            .app_data(web::Data::new(assistant.clone()))
            .app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" }))
            }))
    })
    .bind(&bind)?
    .run()
    .await
}
