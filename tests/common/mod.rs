//! Shared fixtures: a local axum site and a scripted transport.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use webindex_core::transport::{ProbeResponse, ProbeStatus, Transport, TransportError};

pub const MARKER: &str = "Mon, 02 Jan 2006 15:04:05 GMT";

pub const RUST_PAGE: &str = "<html><head><title>Rust Async</title></head><body>\
    <p>Tokio is an async runtime for Rust.</p>\
    <a href=\"/tokio\">tokio</a> <a href=\"https://crates.io/\">crates</a>\
    </body></html>";

pub const WEB_PAGE: &str = "<html><head><title>Web Frameworks</title></head><body>\
    <p>Axum is a web framework built on Tokio.</p>\
    </body></html>";

fn conditional(headers: &HeaderMap, body: &'static str) -> Response {
    let precondition = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok());
    if precondition == Some(MARKER) {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    (
        [(LAST_MODIFIED, MARKER), (CONTENT_TYPE, "text/html")],
        body,
    )
        .into_response()
}

async fn rust_page(headers: HeaderMap) -> Response {
    conditional(&headers, RUST_PAGE)
}

async fn web_page(headers: HeaderMap) -> Response {
    conditional(&headers, WEB_PAGE)
}

async fn unmarked() -> Response {
    ([(CONTENT_TYPE, "text/html")], WEB_PAGE).into_response()
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn large() -> Response {
    ([(CONTENT_TYPE, "text/html")], "a ".repeat(4096)).into_response()
}

async fn moved() -> Redirect {
    Redirect::temporary("/rust")
}

pub fn site() -> Router {
    Router::new()
        .route("/rust", get(rust_page))
        .route("/web", get(web_page))
        .route("/unmarked", get(unmarked))
        .route("/broken", get(broken))
        .route("/large", get(large))
        .route("/moved", get(moved))
}

/// Serve [`site`] on an ephemeral port and return its base URL.
pub async fn spawn_site() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, site()).await.unwrap();
    });
    format!("http://{}", addr)
}

// ─── Scripted transport ─────────────────────────────────────────────

/// Transport serving in-memory pages; a page answers `304` when the
/// caller's marker matches its own.
#[derive(Default)]
pub struct ScriptedTransport {
    pages: Mutex<HashMap<String, (String, String)>>,
    fetches: Mutex<usize>,
}

impl ScriptedTransport {
    pub fn serve(&self, url: &str, html: &str, marker: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), (html.to_string(), marker.to_string()));
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        *self.fetches.lock().unwrap() += 1;
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .map(|(html, _)| html.as_bytes().to_vec())
            .ok_or_else(|| TransportError::UnexpectedStatus {
                url: url.to_string(),
                status: 404,
            })
    }

    async fn probe(
        &self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<ProbeResponse, TransportError> {
        let pages = self.pages.lock().unwrap();
        let Some((_, current)) = pages.get(url) else {
            return Ok(ProbeResponse {
                status: ProbeStatus::Other(404),
                marker: None,
                http_status: 404,
            });
        };
        if !current.is_empty() && marker == Some(current.as_str()) {
            return Ok(ProbeResponse {
                status: ProbeStatus::NotModified,
                marker: None,
                http_status: 304,
            });
        }
        Ok(ProbeResponse {
            status: ProbeStatus::Changed,
            marker: (!current.is_empty()).then(|| current.clone()),
            http_status: 200,
        })
    }
}
