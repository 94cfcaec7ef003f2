mod handlers;
mod state;

pub(crate) use handlers::get_client_ip;
pub use state::AppState;

use axum::http::HeaderValue;
use std::{convert::Infallible, net::SocketAddr};

use axum::extract::State;
use axum::routing::get_service;
use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower::service_fn;
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::{config::SiteConfig, logging};

const GIT_HASH: &str = env!("GIT_HASH");

pub async fn run(config: SiteConfig) -> anyhow::Result<()> {
    let app_state = state::build_state(config);
    let addr = format!(
        "{}:{}",
        app_state.config.bind_address, app_state.config.port
    );

    let app = router(app_state.clone()).layer(middleware::from_fn_with_state(
        app_state.clone(),
        logging::access_log_middleware,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        "Server running on http://{}{}/",
        addr,
        app_state.config.base_path
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Site routes nested under the configured base path, with the shared
/// middleware stack. Access logging is layered on separately by `run`.
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let static_root = ServeDir::new(static_dir.join("root")).fallback(service_fn(|_req| async move {
        let res = handlers::not_found_response().await;
        Ok::<_, Infallible>(res)
    }));

    let site = with_media(Router::new(), &state)
        .route("/api/portfolio-items", get(handlers::portfolio_items_handler))
        .route_service(
            "/portfolio-items.json",
            ServeFile::new(state.config.generated_index_path()),
        )
        .fallback_service(get_service(static_root));

    // Item `src` values are root-relative, so media stays reachable at `/`
    // even when the site itself is nested.
    let app = match state.config.base_path.as_str() {
        "" => site,
        base => with_media(Router::new().nest(base, site), &state),
    };

    app.layer(CompressionLayer::new())
        .layer(middleware::from_fn(handlers::security_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cache_headers_middleware,
        ))
        .with_state(state)
}

fn with_media(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router
        .nest_service("/images", ServeDir::new(state.catalog.images_dir()))
        .nest_service("/videos", ServeDir::new(state.catalog.videos_dir()))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutting down");
}

fn is_asset_path(path: &str) -> bool {
    const ASSET_EXTENSIONS: &[&str] = &[
        ".css", ".js", ".json", ".png", ".jpg", ".jpeg", ".webp", ".avif", ".svg", ".ico",
        ".woff", ".woff2", ".mp4", ".webm",
    ];
    path.contains("/images/")
        || path.contains("/videos/")
        || ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

async fn cache_headers_middleware(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::http::Response<axum::body::Body> {
    let path = req.uri().path().to_ascii_lowercase();
    let mut res = next.run(req).await;
    if !state.config.cache_enabled {
        return res;
    }

    if is_asset_path(&path) && !path.contains("/api/") {
        // fix missing/incorrect content-type (e.g., root-served files)
        let need_ct = res
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .map(|v| v == "application/octet-stream")
            .unwrap_or(true);
        if need_ct {
            if let Some(mime) = path.rsplit('.').next().and_then(guess_mime) {
                res.headers_mut().insert(
                    axum::http::header::CONTENT_TYPE,
                    HeaderValue::from_static(mime),
                );
            }
        }
        res.headers_mut().insert(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=300, stale-while-revalidate=604800"),
        );
        if let Ok(val) = HeaderValue::from_str(&format!("W/\"{}\"", GIT_HASH)) {
            res.headers_mut().insert(axum::http::header::ETAG, val);
        }
        res.headers_mut().insert(
            axum::http::header::VARY,
            HeaderValue::from_static("Accept-Encoding"),
        );
    } else {
        res.headers_mut().insert(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, must-revalidate"),
        );
    }
    res
}

fn guess_mime(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "js" => Some("application/javascript"),
        "json" => Some("application/json"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        "ico" => Some("image/x-icon"),
        "woff" => Some("font/woff"),
        "woff2" => Some("font/woff2"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "txt" => Some("text/plain; charset=utf-8"),
        _ => None,
    }
}
