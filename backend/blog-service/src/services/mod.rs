/// Business logic layer for blog-service
///
/// `PostService` sequences the store of record, the post cache and the search
/// index for every post operation.
pub mod posts;

pub use posts::PostService;
