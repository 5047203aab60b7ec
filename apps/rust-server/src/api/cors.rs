// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-origin policy for the storefront.
//!
//! A request whose `Origin` starts with an allow-listed origin gets that
//! origin echoed back; every other request (including one without `Origin`)
//! gets the first allow-listed origin. The wildcard is never emitted.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
        },
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Arc<[String]>,
}

impl CorsPolicy {
    /// `allowed_origins` must be non-empty; configuration loading enforces it.
    pub fn new(allowed_origins: &[String]) -> Self {
        Self {
            allowed_origins: allowed_origins.into(),
        }
    }

    /// The value for `Access-Control-Allow-Origin`.
    pub fn allow_origin<'a>(&'a self, request_origin: Option<&'a str>) -> &'a str {
        if let Some(origin) = request_origin {
            if self
                .allowed_origins
                .iter()
                .any(|allowed| origin_matches(origin, allowed))
            {
                return origin;
            }
        }
        self.allowed_origins
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Prefix match that stops at a host boundary, so `https://shop.example.com`
/// does not admit `https://shop.example.com.evil.net`.
fn origin_matches(origin: &str, allowed: &str) -> bool {
    match origin.strip_prefix(allowed) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with(':'),
        None => false,
    }
}

/// Adds CORS headers to every response and answers preflight requests.
pub async fn cors_middleware(
    State(policy): State<CorsPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let request_origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let allow_origin = policy.allow_origin(request_origin.as_deref());
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(allow_origin) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, body::to_bytes, routing::post, Router};
    use tower::ServiceExt;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(&[
            "https://shop.example.com".to_string(),
            "http://localhost:5173".to_string(),
        ])
    }

    #[test]
    fn allowed_origin_is_echoed() {
        let policy = policy();
        assert_eq!(
            policy.allow_origin(Some("http://localhost:5173")),
            "http://localhost:5173"
        );
        assert_eq!(
            policy.allow_origin(Some("https://shop.example.com/")),
            "https://shop.example.com/"
        );
        assert_eq!(
            policy.allow_origin(Some("https://shop.example.com:8443")),
            "https://shop.example.com:8443"
        );
    }

    #[test]
    fn unknown_or_missing_origin_gets_first_entry() {
        let policy = policy();
        assert_eq!(policy.allow_origin(None), "https://shop.example.com");
        assert_eq!(
            policy.allow_origin(Some("https://evil.example.net")),
            "https://shop.example.com"
        );
        assert_eq!(
            policy.allow_origin(Some("https://shop.example.com.evil.net")),
            "https://shop.example.com"
        );
        assert_ne!(policy.allow_origin(Some("*")), "*");
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(|| async { "handled" }))
            .layer(axum::middleware::from_fn_with_state(policy(), cors_middleware))
    }

    #[tokio::test]
    async fn preflight_is_answered_without_reaching_handler() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/echo")
                    .header(ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn headers_are_added_to_handler_responses() {
        let response = app()
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::POST)
                    .uri("/echo")
                    .header(ORIGIN, "https://attacker.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
        assert_eq!(response.headers()[VARY], "Origin");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"handled");
    }
}
