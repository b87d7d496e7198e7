use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use blog_service::cache::{CacheStore, InMemoryCacheStore, PostCache, RedisCacheStore};
use blog_service::config::CacheBackend;
use blog_service::db::PgPostStore;
use blog_service::handlers;
use blog_service::openapi::ApiDoc;
use blog_service::search::ElasticsearchIndex;
use blog_service::services::PostService;
use chrono::Utc;
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "blog-service";

struct HealthState {
    db_pool: sqlx::PgPool,
    redis: Option<RedisCacheStore>,
    search: ElasticsearchIndex,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }
}

fn timed_check<E: std::fmt::Display>(
    result: Result<(), E>,
    started: Instant,
    ok_message: &str,
    failure_status: ComponentStatus,
    failure_prefix: &str,
) -> ComponentCheck {
    let latency_ms = Some(started.elapsed().as_millis() as u64);
    match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: ok_message.to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: failure_status,
            message: format!("{}: {}", failure_prefix, e),
            latency_ms,
        },
    }
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::error!(error = %e, "health check: PostgreSQL unreachable");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": SERVICE_NAME
            }))
        }
    }
}

/// Only PostgreSQL gates readiness; cache and search outages degrade.
async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let pg_result = state.check_postgres().await;
    let ready = pg_result.is_ok();
    checks.insert(
        "postgresql".to_string(),
        timed_check(
            pg_result,
            start,
            "PostgreSQL connection successful",
            ComponentStatus::Unhealthy,
            "PostgreSQL connection failed",
        ),
    );

    let cache_check = match &state.redis {
        Some(redis) => {
            let start = Instant::now();
            timed_check(
                redis.ping().await,
                start,
                "Redis ping successful",
                ComponentStatus::Degraded,
                "Redis ping failed",
            )
        }
        None => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "In-process cache".to_string(),
            latency_ms: None,
        },
    };
    let mut degraded = !matches!(cache_check.status, ComponentStatus::Healthy);
    checks.insert("cache".to_string(), cache_check);

    let start = Instant::now();
    let es_check = timed_check(
        state.search.ping().await,
        start,
        "Elasticsearch ping successful",
        ComponentStatus::Degraded,
        "Elasticsearch ping failed",
    );
    degraded |= !matches!(es_check.status, ComponentStatus::Healthy);
    checks.insert("elasticsearch".to_string(), es_check);

    let status = match (ready, degraded) {
        (false, _) => ComponentStatus::Unhealthy,
        (true, true) => ComponentStatus::Degraded,
        (true, false) => ComponentStatus::Healthy,
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    tracing::error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

/// Blog Service
///
/// # Routes
///
/// - `/` - liveness banner
/// - `/api/v1/posts/*` - create, read, update, tag lookup and full-text search
/// - `/api/v1/health*` - health, readiness and liveness
/// - `/metrics` - Prometheus
#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    // Container healthcheck: `blog-service healthcheck`
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        let port = std::env::var("BLOG_SERVICE_PORT")
            .or_else(|_| std::env::var("PORT"))
            .unwrap_or_else(|_| "8080".to_string());
        let url = format!("http://127.0.0.1:{}/api/v1/health", port);
        return match reqwest::Client::new().get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                eprintln!("healthcheck HTTP status: {}", resp.status());
                Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
            }
            Err(e) => {
                eprintln!("healthcheck HTTP error: {}", e);
                Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
            }
        };
    }

    init_tracing();

    let config = match blog_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_config = DbPoolConfig::new(SERVICE_NAME, config.database.url.clone())
        .with_max_connections(config.database.max_connections);
    db_config.log_config();
    let db_pool = create_pg_pool(db_config)
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .map_err(|e| startup_error("Failed to run migrations", e))?;
        tracing::info!("Database migrations applied");
    }

    blog_service::metrics::record_pool_occupancy(&db_pool);
    blog_service::metrics::spawn_pool_occupancy(db_pool.clone(), Duration::from_secs(30));

    let timeouts = config.timeouts();

    let (cache_store, redis_store): (Arc<dyn CacheStore>, Option<RedisCacheStore>) =
        match config.cache.backend {
            CacheBackend::Redis => {
                let redis = RedisCacheStore::connect_or_defer(
                    &config.cache.url,
                    Duration::from_secs(5),
                    Duration::from_secs(10),
                )
                .await;
                if redis.is_connected() {
                    tracing::info!("Redis cache connected");
                }
                let store: Arc<dyn CacheStore> = Arc::new(redis.clone());
                (store, Some(redis))
            }
            CacheBackend::Memory => {
                tracing::warn!("Using in-process cache; entries are not shared between instances");
                let memory = InMemoryCacheStore::new();
                memory.spawn_sweeper(Duration::from_secs(60));
                let store: Arc<dyn CacheStore> = Arc::new(memory);
                (store, None)
            }
        };

    let search_index = ElasticsearchIndex::new(
        &config.search.url,
        &config.search.index,
        config.search.max_results,
    )
    .map_err(|e| startup_error("Failed to build Elasticsearch client", e))?;

    let post_service = web::Data::new(PostService::new(
        Arc::new(PgPostStore::new(db_pool.clone())),
        PostCache::new(cache_store, timeouts.cache),
        Arc::new(search_index.clone()),
        timeouts,
    ));

    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
        redis: redis_store,
        search: search_index,
    });

    let openapi_doc = web::Data::new(ApiDoc::openapi());
    let bind_address = config.bind_address();
    let allowed_origins = config.cors.allowed_origins.clone();

    tracing::info!("HTTP server listening on {}", bind_address);

    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(openapi_doc.clone())
            .app_data(post_service.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .route("/metrics", web::get().to(blog_service::metrics::serve_metrics))
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    tracing::info!("{} shutting down", SERVICE_NAME);
    db_pool.close().await;

    Ok(())
}
