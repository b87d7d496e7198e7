/// HTTP handlers for blog-service
///
/// `configure` is the one route table; the binary and the HTTP tests both
/// mount it.
pub mod posts;

pub use posts::{create_post, get_post, index, search_by_tag, search_posts, update_post};

use crate::error::AppError;
use actix_web::web;

/// Request bodies larger than this are rejected before parsing.
const JSON_LIMIT_BYTES: usize = 512 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(index))
        .service(
            web::scope("/api/v1/posts")
                // Literal segments first so they are not captured as `{id}`.
                .route("/search", web::get().to(search_posts))
                .route("/tag/{tag}", web::get().to(search_by_tag))
                .route("", web::post().to(create_post))
                .route("/{id}", web::get().to(get_post))
                .route("/{id}", web::put().to(update_post)),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            tracing::debug!(error = %err, "rejected request body");
            AppError::BadRequest(format!("malformed request body: {}", err)).into()
        })
}
