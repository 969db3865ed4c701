use crate::{
    api::handlers::health,
    session::{AuthConfig, MemorySessionStore, OAuthConfig, PgSessionStore, SessionStore},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::options,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span, warn};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use handlers::auth::AuthState;
pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Where users are persisted.
#[derive(Debug)]
pub enum StoreBackend {
    Postgres { dsn: String },
    InMemory,
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    backend: StoreBackend,
    auth_config: AuthConfig,
    oauth_config: OAuthConfig,
    frontend_base_url: &str,
) -> Result<()> {
    let store = connect_store(backend).await?;
    let auth_state = Arc::new(AuthState::with_google(auth_config, oauth_config, store)?);
    let origin = frontend_origin(frontend_base_url)?;

    let app = app(auth_state, Some(origin));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn connect_store(backend: StoreBackend) -> Result<Arc<dyn SessionStore>> {
    match backend {
        StoreBackend::Postgres { dsn } => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(&dsn)
                .await
                .context("Failed to connect to database")?;
            Ok(Arc::new(PgSessionStore::new(pool)))
        }
        StoreBackend::InMemory => {
            warn!("Using the in-memory session store; users are lost on restart");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

/// Assemble the full application: documented routes, tracing, request ids,
/// CORS (when a frontend origin is given) and the shared auth state.
pub fn app(auth_state: Arc<AuthState>, frontend_origin: Option<HeaderValue>) -> Router {
    // Build the router from OpenAPI-wired routes, then extend it with non-doc routes like the
    // preflight-only `OPTIONS /health`. The document stays in openapi.rs for the `openapi` binary.
    let (router, _openapi) = router().split_for_parts();
    let router = router.route("/health", options(health::health));

    let router = match frontend_origin {
        Some(origin) => router.layer(
            CorsLayer::new()
                .allow_headers([CONTENT_TYPE, AUTHORIZATION])
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(AllowOrigin::exact(origin))
                .allow_credentials(true),
        ),
        None => router,
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth_state)),
    )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
