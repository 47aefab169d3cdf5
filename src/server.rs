//! HTTP surface of the site.
//!
//! Every handler works directly against the filesystem; nothing is cached
//! between requests.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Form,
    Router,
    extract::{Path as UrlPath, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    doc_root::{DocRoot, is_markdown},
    document::{self, Document},
    error::{Error, Result},
    export::{self, Converter, ExportFormat},
    search::{self, SearchRequest},
    sidebar,
};

/// URL prefix prepended to search result paths.
pub const DEFAULT_URL_PREFIX: &str = "/docs";

/// Section index page served when none is named.
const DEFAULT_SECTION_INDEX: &str = "index";

/// Settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub url_prefix: String,
    /// Directory holding `<section>.html` landing pages.
    pub index_dir: Option<PathBuf>,
    pub converter: Converter,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            index_dir: None,
            converter: Converter::default(),
        }
    }
}

struct AppState {
    root: DocRoot,
    config: SiteConfig,
}

impl AppState {
    /// Accept document paths either root-relative or as returned by search
    /// (with the URL prefix).
    fn document_path<'a>(&self, file: &'a str) -> &'a str {
        let prefix = self.config.url_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return file;
        }
        file.strip_prefix(prefix)
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(file)
    }
}

type SharedState = Arc<AppState>;

/// Build the router for a document root.
pub fn router(root: DocRoot, config: SiteConfig) -> Router {
    let prefix = config.url_prefix.trim_end_matches('/').to_string();
    let state = Arc::new(AppState { root, config });

    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/search", get(search_handler))
        .route("/sidebar", get(sidebar_handler))
        .route("/render", get(render_get).post(render_post))
        .route("/download", get(download_get).post(download_post))
        .route("/section", get(section_handler));

    if !prefix.is_empty() {
        router = router.route(&format!("{prefix}/{{*path}}"), get(asset_handler));
    }

    router.with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(
    root: DocRoot,
    config: SiteConfig,
    addr: SocketAddr,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        root = %root.path().display(),
        "listening"
    );

    axum::serve(listener, router(root, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

/// Run filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Locked => StatusCode::FORBIDDEN,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Error::EmptyQuery => "Error: Empty query.".to_string(),
            Error::InvalidSection(section) => {
                format!("Error: Invalid section. {section}")
            }
            Error::InvalidPath(_) => "Invalid file request.".to_string(),
            Error::UnsupportedFormat(_) => "Invalid format request.".to_string(),
            Error::ConversionFailed {
                command,
                status,
                output,
            } => format!(
                "Failed to generate PDF.\nCommand: {command}\nStatus: {status}\nOutput:\n{output}"
            ),
            other => format!("Error: {other}"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    section: Option<String>,
}

async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Response> {
    let worker = state.clone();
    let mut request = SearchRequest::new(params.q.clone());
    if let Some(section) = params.section {
        request = request.in_section(section);
    }

    let results = blocking(move || {
        search::execute_search(&worker.root, &worker.config.url_prefix, &request)
    })
    .await??;

    tracing::info!(
        route = "/search",
        query = %params.q.trim(),
        results = results.len(),
        "search"
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        search::format_lines(&results),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct SidebarParams {
    #[serde(default)]
    section: String,
    file: Option<String>,
}

async fn sidebar_handler(
    State(state): State<SharedState>,
    Query(params): Query<SidebarParams>,
) -> Result<Html<String>> {
    let html = blocking(move || {
        let file = params.file.as_deref().map(|f| state.document_path(f));
        sidebar::render_sidebar(&state.root, &params.section, file)
    })
    .await?;
    Ok(Html(html))
}

#[derive(Debug, Deserialize)]
struct RenderParams {
    #[serde(default)]
    file: String,
    password: Option<String>,
}

async fn render_get(
    State(state): State<SharedState>,
    Query(params): Query<RenderParams>,
) -> Result<Html<String>> {
    // Credentials are only accepted in a form body.
    render_document(state, params.file, None).await
}

async fn render_post(
    State(state): State<SharedState>,
    Form(params): Form<RenderParams>,
) -> Result<Html<String>> {
    render_document(state, params.file, params.password).await
}

async fn render_document(
    state: SharedState,
    file: String,
    password: Option<String>,
) -> Result<Html<String>> {
    let html = blocking(move || {
        let document = Document::open(&state.root, state.document_path(&file))?;
        tracing::info!(
            route = "/render",
            file = document.relative(),
            access = ?document.unlock(password.as_deref()),
            "render"
        );
        Ok::<_, Error>(document::render_page(
            &document,
            password.as_deref(),
            &state.config.url_prefix,
        ))
    })
    .await??;
    Ok(Html(html))
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    #[serde(default)]
    file: String,
    #[serde(default)]
    format: String,
    password: Option<String>,
}

async fn download_get(
    State(state): State<SharedState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response> {
    let params = DownloadParams {
        password: None,
        ..params
    };
    download(state, params).await
}

async fn download_post(
    State(state): State<SharedState>,
    Form(params): Form<DownloadParams>,
) -> Result<Response> {
    download(state, params).await
}

async fn download(state: SharedState, params: DownloadParams) -> Result<Response> {
    let worker = state.clone();
    let file = params.file;
    let document =
        blocking(move || Document::open(&worker.root, worker.document_path(&file)))
            .await??;
    let format: ExportFormat = params.format.parse()?;

    let exported = export::export(
        &document,
        format,
        params.password.as_deref(),
        &state.config.converter,
    )
    .await?;

    tracing::info!(
        route = "/download",
        file = document.relative(),
        format = format.extension(),
        bytes = exported.bytes.len(),
        "download"
    );

    let disposition = format!(
        "attachment; filename=\"{}\"",
        exported.filename.replace(['"', '\\'], "_")
    );
    let mut response = exported.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(exported.content_type),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct SectionParams {
    section: Option<String>,
}

async fn section_handler(
    State(state): State<SharedState>,
    Query(params): Query<SectionParams>,
) -> Response {
    let section = params
        .section
        .unwrap_or_else(|| DEFAULT_SECTION_INDEX.to_string());

    if section.is_empty()
        || !section
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return (
            StatusCode::BAD_REQUEST,
            Html("<p>Error: Invalid section name.</p>".to_string()),
        )
            .into_response();
    }

    let not_found = (
        StatusCode::NOT_FOUND,
        Html("<p>Requested section not found.</p>".to_string()),
    );
    let Some(dir) = state.config.index_dir.as_ref() else {
        return not_found.into_response();
    };

    let candidates = [
        dir.join(format!("{section}.html")),
        dir.join(format!("{DEFAULT_SECTION_INDEX}.html")),
    ];
    for candidate in candidates {
        if let Ok(contents) = tokio::fs::read_to_string(&candidate).await {
            return Html(contents).into_response();
        }
    }
    not_found.into_response()
}

/// Serve a file from under the root. Markdown sources are only served raw
/// when they carry no password; protected documents go through `/render`.
async fn asset_handler(
    State(state): State<SharedState>,
    UrlPath(path): UrlPath<String>,
) -> Result<Response> {
    let worker = state.clone();
    let resolved = blocking(move || -> Result<PathBuf> {
        let resolved = worker.root.resolve_file(&path)?;
        if is_markdown(&resolved) && document::is_protected_file(&resolved)? {
            return Err(Error::Locked);
        }
        Ok(resolved)
    })
    .await??;

    let bytes = tokio::fs::read(&resolved).await?;
    let mime = mime_guess::from_path(&resolved).first_or_octet_stream();

    let mut response = bytes.into_response();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}
