pub mod api;
pub mod config;
pub mod models;
pub mod services;

use crate::config::AppConfig;
use crate::services::archive::ArchiveBuilder;
use crate::services::classifier::Classifier;
use crate::services::disk::DiskApi;
use crate::services::listing_cache::ListingCache;
use crate::services::resolver::FileResolver;
use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::list_files,
        api::handlers::files::list_files_form,
        api::handlers::files::download_file,
        api::handlers::files::download_multiple,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::ListRequest,
            api::handlers::files::ListedEntry,
            api::handlers::files::ListingResponse,
            api::handlers::health::HealthResponse,
            models::Entry,
            models::EntryKind,
            models::Category,
            models::FileTypeFilter,
        )
    ),
    tags(
        (name = "files", description = "Public share browsing and download endpoints"),
        (name = "system", description = "Service endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub disk: Arc<dyn DiskApi>,
    pub listing_cache: Arc<dyn ListingCache>,
    pub classifier: Arc<Classifier>,
    pub resolver: Arc<FileResolver>,
    pub archive: Arc<ArchiveBuilder>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the resolver and archive builder on top of the given provider
    /// client and cache.
    pub fn new(
        disk: Arc<dyn DiskApi>,
        listing_cache: Arc<dyn ListingCache>,
        config: AppConfig,
    ) -> Self {
        let resolver = Arc::new(FileResolver::new(disk.clone()));
        let archive = Arc::new(ArchiveBuilder::new(
            resolver.clone(),
            config.archive_fetch_concurrency,
        ));

        Self {
            disk,
            listing_cache,
            classifier: Arc::new(Classifier::default()),
            resolver,
            archive,
            config,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Span for one HTTP request. Runs after the request-id middleware, so the
/// id is always present.
fn http_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(api::middleware::request_id::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(api::handlers::files::list_files).post(api::handlers::files::list_files_form),
        )
        .route("/download", get(api::handlers::files::download_file))
        .route("/download/", get(api::handlers::files::download_file))
        .route(
            "/download_multiple",
            post(api::handlers::files::download_multiple),
        )
        .route(
            "/download_multiple/",
            post(api::handlers::files::download_multiple),
        )
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(http_span)
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(|response: &Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                }),
        )
        .layer(from_fn(
            api::middleware::request_id::request_id_middleware,
        ))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_form_size,
        ))
        .with_state(state)
}
