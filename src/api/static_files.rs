//! Embedded SPA shell. Mirrors the reference daemon's embedded-vs-filesystem
//! static serving split, minus the dev-mode `ServeDir` branch: this service
//! has no interactive frontend dev server, so only the embedded path exists.

use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use include_dir::{Dir, include_dir};

static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/web/dist");

/// `GET /`: always the SPA shell.
pub async fn index() -> impl IntoResponse {
    serve_path("index.html")
}

/// Fallback for every unmatched path: serve the embedded asset if one
/// exists at that path, otherwise fall back to `index.html` for
/// client-side routing.
pub async fn serve(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');
    if ASSETS.get_file(path).is_some() { serve_path(path) } else { serve_path("index.html") }
}

fn serve_path(path: &str) -> Response {
    match ASSETS.get_file(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], file.contents().to_vec()).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
