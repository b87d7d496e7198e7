/// OpenAPI documentation for Blog Service
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog Service API",
        version = "1.0.0",
        description = "Blog posts with tag lookups and full-text search. Reads are served cache-aside; writes go to PostgreSQL first, then invalidate the cache and refresh the search index.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server"),
    ),
    paths(
        crate::handlers::posts::search_posts,
        crate::handlers::posts::search_by_tag,
        crate::handlers::posts::create_post,
        crate::handlers::posts::get_post,
        crate::handlers::posts::update_post,
    ),
    components(schemas(
        crate::models::Post,
        crate::models::SearchDocument,
        crate::handlers::posts::PostRequest,
        crate::handlers::posts::PostWriteResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "posts", description = "Post creation, retrieval, updates and search"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn openapi_json_path() -> &'static str {
        "/api/v1/openapi.json"
    }
}
