pub mod file_handlers;
pub mod form_handlers;
pub mod generate_handlers;
pub mod response_handlers;

use actix_web::web;

/// Register the /forms API. Literal segments (generate, upload, download)
/// are registered BEFORE /{id} so they are matched first.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/forms")
            .route("", web::get().to(form_handlers::list))
            .route("", web::post().to(form_handlers::create))
            .route("/generate", web::post().to(generate_handlers::generate))
            .route("/upload", web::post().to(file_handlers::upload))
            .route("/upload/{fileId}", web::get().to(file_handlers::fetch))
            .route("/upload/{fileId}", web::delete().to(file_handlers::delete))
            .route("/download/{fileId}", web::get().to(file_handlers::download))
            .route("/{id}", web::get().to(form_handlers::read))
            .route("/{id}", web::put().to(form_handlers::update))
            .route("/{id}", web::delete().to(form_handlers::delete))
            .route("/{id}/submit", web::post().to(response_handlers::submit))
            .route("/{id}/responses", web::get().to(response_handlers::listing))
            .route(
                "/{id}/responses",
                web::post().to(response_handlers::listing_filtered),
            )
            .route(
                "/{id}/files/{questionId}",
                web::get().to(file_handlers::list_by_question),
            ),
    );
}
