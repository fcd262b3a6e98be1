//! HTTP boundary: upload form, statement rendering endpoint, PDF download and
//! static assets.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use chrono::{Local, NaiveDate};
use http::{StatusCode, header};
use statement_core::{ErrorKind, RenderedStatement, RequestId, StatementError, StatementMetadata, StatementRenderer, StatementStore};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Upload form, embedded at compile time.
static HOME: &str = include_str!("templates/home.html");

/// Confirmation page with `__REQUEST_ID__`, `__ROWS__` and `__TOTAL__` placeholders.
static DOCUMENT: &str = include_str!("templates/document.html");

const NOT_FOUND_MESSAGE: &str = "File not found.";
const FAILURE_MESSAGE: &str = "Failed to generate the statement.";

/// Form field carrying the spreadsheet.
pub const SPREADSHEET_FIELD: &str = "excel_file";

#[derive(Clone)]
pub struct AppState {
    store: StatementStore,
    renderer: Arc<StatementRenderer>,
    fixed_date: Option<NaiveDate>,
}

impl AppState {
    pub fn new(store: StatementStore, renderer: StatementRenderer) -> Self {
        Self {
            store,
            renderer: Arc::new(renderer),
            fixed_date: None,
        }
    }

    /// Stamp every statement with `date` instead of today's local date.
    pub fn with_fixed_date(mut self, date: NaiveDate) -> Self {
        self.fixed_date = Some(date);
        self
    }

    fn statement_date(&self) -> NaiveDate {
        self.fixed_date.unwrap_or_else(|| Local::now().date_naive())
    }
}

pub fn router(state: AppState, static_dir: &Path, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/document", post(upload))
        .route("/documents/{id}", get(download))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config) -> Result<()> {
    let store = StatementStore::open(&config.storage.data_dir)
        .with_context(|| format!("Failed to open data dir {}", config.storage.data_dir.display()))?;
    let state = AppState::new(store, StatementRenderer::new(config.labels.clone()));
    let app = router(state, &config.storage.static_dir, config.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;

    tracing::info!(
        addr = %config.server.addr,
        data_dir = %config.storage.data_dir.display(),
        "listening on http://{}",
        config.server.addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn home() -> Html<&'static str> {
    Html(HOME)
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    match handle_upload(&state, multipart).await {
        Ok(rendered) => Html(
            DOCUMENT
                .replace("__REQUEST_ID__", rendered.id.as_str())
                .replacen("__ROWS__", &rendered.rows.to_string(), 1)
                .replacen("__TOTAL__", &statement_core::spreadsheet::format_number(rendered.total), 1),
        )
        .into_response(),
        Err(e) => failure_response("upload", &e),
    }
}

async fn handle_upload(state: &AppState, mut multipart: Multipart) -> Result<RenderedStatement> {
    let mut metadata = StatementMetadata::default();
    let mut spreadsheet: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.context("Failed to read multipart body")? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            SPREADSHEET_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.context("Failed to read spreadsheet upload")?;
                if !data.is_empty() {
                    spreadsheet = Some((file_name, data));
                }
            }
            "company-name" => metadata.sender_name = field.text().await?,
            "company-address" => metadata.sender_address = field.text().await?,
            "target-company-name" => metadata.recipient_name = field.text().await?,
            "target-company-address" => metadata.recipient_address = field.text().await?,
            other => tracing::debug!(field = other, "ignoring form field"),
        }
    }

    let Some((file_name, data)) = spreadsheet else {
        return Err(StatementError::NotFound("no spreadsheet in upload".into()).into());
    };

    let id = RequestId::generate();
    let as_of = state.statement_date();
    tracing::info!(request = %id, file = %file_name, bytes = data.len(), "received upload");

    let state = state.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        state.store.save_spreadsheet(&id, &file_name, &data)?;
        state.store.save_metadata(&id, &metadata)?;
        state.renderer.render_request(&state.store, &id, as_of)
    })
    .await
    .context("Render task failed")??;

    Ok(rendered)
}

async fn download(State(state): State<AppState>, UrlPath(id): UrlPath<String>) -> Response {
    let Some(id) = RequestId::parse(&id) else {
        return (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response();
    };

    match state.store.read_output(&id) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (header::CONTENT_DISPOSITION, format!("inline; filename=\"{id}.pdf\"")),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => failure_response("download", &e.into()),
    }
}

/// Log the full error chain; answer with a generic message only.
fn failure_response(context: &str, err: &anyhow::Error) -> Response {
    let kind = err.downcast_ref::<StatementError>().map(StatementError::kind);
    match kind {
        Some(ErrorKind::NotFound) => {
            tracing::warn!(context, "{:#}", err);
            (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
        }
        _ => {
            tracing::error!(context, "{:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE).into_response()
        }
    }
}
