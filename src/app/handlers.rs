use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use std::net::SocketAddr;

use super::state::AppState;

const FAILED_TO_LOAD: &str = "Failed to load portfolio items";
const CSP: &str = "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; media-src 'self'; font-src 'self'; frame-src https://www.youtube.com https://www.youtube-nocookie.com; connect-src 'self'; object-src 'none'; frame-ancestors 'self'; base-uri 'self'";

/// Error body returned by the items endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub status_message: &'static str,
    pub data: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn load_failure(data: String) -> ApiError {
    ApiError {
        status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        status_message: FAILED_TO_LOAD,
        data,
    }
}

/// Resolves from disk on every call; nothing is cached between requests.
pub async fn portfolio_items_handler(State(state): State<AppState>) -> Response {
    let catalog = state.catalog.clone();
    match tokio::task::spawn_blocking(move || catalog.resolve()).await {
        Ok(Ok(items)) => {
            tracing::debug!(count = items.len(), "resolved portfolio items");
            Json(items).into_response()
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "error reading portfolio items");
            load_failure(err.to_string()).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "portfolio resolution task failed");
            load_failure(err.to_string()).into_response()
        }
    }
}

/// Client address, preferring proxy headers only when the proxy is trusted.
pub(crate) fn get_client_ip(headers: &HeaderMap, addr: &SocketAddr, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    addr.ip().to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let cf = headers
        .get("CF-Connecting-IP")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ip) = cf {
        return Some(ip.to_string());
    }
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub async fn not_found_response() -> Response {
    let html = r#"<!doctype html>
<html lang="fr">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>404 | Portfolio</title>
  <style>
    body{margin:0;display:flex;align-items:center;justify-content:center;height:100vh;background:#111;color:#eee;font-family:system-ui,-apple-system,"Segoe UI",sans-serif;}
    .card{padding:24px 28px;text-align:center;max-width:360px;}
    h1{margin:0 0 12px;font-size:20px;}
    p{margin:0;color:#bbb;font-size:14px;}
    a{color:#fff;}
  </style>
</head>
<body>
  <div class="card">
    <h1>404</h1>
    <p>La page demandée est introuvable.</p>
    <p><a href="./">Retour au portfolio</a></p>
  </div>
</body>
</html>"#;
    (StatusCode::NOT_FOUND, Html(html)).into_response()
}

pub async fn security_middleware(req: Request<Body>, next: Next) -> Response {
    if req.uri().path().len() >= 200 {
        return StatusCode::URI_TOO_LONG.into_response();
    }
    let mut res = next.run(req).await;
    let res_headers = res.headers_mut();
    res_headers.insert(
        axum::http::header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    res_headers.insert(
        axum::http::header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    res_headers.insert(
        axum::http::header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    res_headers.insert(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    res_headers.insert(
        axum::http::header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP),
    );
    res_headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("geolocation=(), microphone=(), camera=(), browsing-topics=(), interest-cohort=(), payment=()"),
    );
    res_headers.insert(
        "Cross-Origin-Opener-Policy",
        HeaderValue::from_static("same-origin"),
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr() -> SocketAddr {
        "10.0.0.7:4242".parse().unwrap()
    }

    #[test]
    fn proxy_headers_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(get_client_ip(&headers, &addr(), false), "10.0.0.7");
        assert_eq!(get_client_ip(&headers, &addr(), true), "203.0.113.9");
    }

    #[test]
    fn cloudflare_header_preferred() {
        let mut headers = HeaderMap::new();
        headers.insert("CF-Connecting-IP", HeaderValue::from_static(" 198.51.100.1 "));
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(get_client_ip(&headers, &addr(), true), "198.51.100.1");
    }

    #[test]
    fn first_forwarded_hop_used() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(get_client_ip(&headers, &addr(), true), "203.0.113.9");
        headers.insert("X-Forwarded-For", HeaderValue::from_static(" "));
        assert_eq!(get_client_ip(&headers, &addr(), true), "10.0.0.7");
    }

    #[test]
    fn error_body_shape() {
        let body = serde_json::to_value(load_failure("boom".into())).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "statusCode": 500,
                "statusMessage": "Failed to load portfolio items",
                "data": "boom"
            })
        );
    }
}
