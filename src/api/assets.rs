//! Embedded static pages and assets
//!
//! Debug builds read `ui/` from disk, release builds embed it.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

/// Serve files under `/assets/`
pub async fn serve_static(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Serve one of the HTML pages
pub fn page(name: &str) -> Response {
    match Assets::get(name).and_then(|content| String::from_utf8(content.data.into_owned()).ok()) {
        Some(html) => Html(html).into_response(),
        None => {
            tracing::error!(page = name, "Page missing from embedded assets");
            (StatusCode::NOT_FOUND, Html("<h1>404 - page not found</h1>")).into_response()
        }
    }
}
