/// Post handlers - HTTP endpoints for post operations
use crate::error::{AppError, ErrorBody, Result};
use crate::models::{Post, PostDraft, SearchDocument};
use crate::services::PostService;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Body of create and update requests.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PostRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(max = 100000))]
    pub content: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub tags: Vec<String>,
}

impl PostRequest {
    fn into_draft(self) -> Result<PostDraft> {
        if let Err(e) = self.validate() {
            let mut fields: Vec<String> = e.field_errors().keys().map(|k| k.to_string()).collect();
            fields.sort();
            return Err(AppError::BadRequest(format!(
                "invalid field(s): {}",
                fields.join(", ")
            )));
        }
        PostDraft::new(self.title, self.content, self.tags)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostWriteResponse {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text query matched against title and content
    pub q: Option<String>,
}

fn parse_post_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("invalid post id: {}", raw)))
}

/// Liveness banner
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Blog API is running!")
}

/// Full-text search over post title and content
#[utoipa::path(
    get,
    path = "/api/v1/posts/search",
    tag = "posts",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching documents, best match first", body = [SearchDocument]),
        (status = 400, description = "Missing query", body = ErrorBody),
        (status = 503, description = "Search index unavailable", body = ErrorBody),
        (status = 504, description = "Search index timed out", body = ErrorBody)
    )
)]
pub async fn search_posts(
    service: web::Data<PostService>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let q = query.into_inner().q.unwrap_or_default();
    let docs = service.search_posts(&q).await?;
    Ok(HttpResponse::Ok().json(docs))
}

/// Posts carrying a tag, newest first
#[utoipa::path(
    get,
    path = "/api/v1/posts/tag/{tag}",
    tag = "posts",
    params(("tag" = String, Path, description = "Tag to match exactly")),
    responses(
        (status = 200, description = "Posts with the tag (possibly none)", body = [Post]),
        (status = 400, description = "Missing tag", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn search_by_tag(
    service: web::Data<PostService>,
    tag: web::Path<String>,
) -> Result<HttpResponse> {
    let posts = service.search_by_tag(&tag).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// Create a post
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = PostWriteResponse),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn create_post(
    service: web::Data<PostService>,
    req: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    let draft = req.into_inner().into_draft()?;
    let id = service.create_post(draft).await?;

    Ok(HttpResponse::Created().json(PostWriteResponse {
        id,
        message: "Post created and logged successfully".to_string(),
    }))
}

/// Get a post by ID
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post found", body = Post),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn get_post(
    service: web::Data<PostService>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = parse_post_id(&id)?;
    let post: Post = service.get_post(id).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Replace a post's title, content and tags
#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Post updated", body = PostWriteResponse),
        (status = 400, description = "Invalid id or body", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn update_post(
    service: web::Data<PostService>,
    id: web::Path<String>,
    req: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    let id = parse_post_id(&id)?;
    let draft = req.into_inner().into_draft()?;
    service.update_post(id, draft).await?;

    Ok(HttpResponse::Ok().json(PostWriteResponse {
        id,
        message: "Post updated successfully".to_string(),
    }))
}
