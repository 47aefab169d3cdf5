use std::path::Path;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use docsite::{
    Converter,
    DocRoot,
    server::{self, SiteConfig},
};
use tower::ServiceExt;

fn setup_site(dir: &Path) -> Result<Router, Box<dyn std::error::Error>> {
    let docs = dir.join("docs");
    std::fs::create_dir_all(docs.join("guide/img"))?;
    std::fs::create_dir_all(docs.join("empty"))?;
    std::fs::write(
        docs.join("guide/widgets.md"),
        "---\ntitle: All About Widgets\n---\n# Widgets\n\n![diagram](img/d.png)\n\nwidget text\n",
    )?;
    std::fs::write(docs.join("guide/other.md"), "# Other\n\nmentions widget\n")?;
    std::fs::write(
        docs.join("guide/locked.md"),
        "---\npassword: secret\n---\n# Locked\n\nconfidential notes\n",
    )?;
    std::fs::write(docs.join("guide/img/d.png"), [0x89, b'P', b'N', b'G'])?;

    let indexes = dir.join("indexes");
    std::fs::create_dir_all(&indexes)?;
    std::fs::write(indexes.join("index.html"), "<p>home</p>")?;
    std::fs::write(indexes.join("guide.html"), "<p>guide landing</p>")?;

    let root = DocRoot::open(&docs)?;
    let config = SiteConfig {
        index_dir: Some(indexes),
        ..SiteConfig::default()
    };
    Ok(server::router(root, config))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn post_form(app: &Router, uri: &str, form: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn search_returns_ranked_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/search?q=widget").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        "/docs/guide/widgets.md | All About Widgets\n/docs/guide/other.md | Other\n"
    );

    let (status, body) = get(&app, "/search?q=widget&section=guide").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn search_errors_are_plain_text() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Error: Empty query.");

    let (status, body) = get(&app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains('|'));

    let (status, body) =
        get(&app, "/search?q=widget&section=..%2F..%2Fetc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Error: Invalid section."));
    Ok(())
}

#[tokio::test]
async fn sidebar_lists_section() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) =
        get(&app, "/sidebar?section=guide&file=guide%2Fother.md").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(">All About Widgets</a>"));
    assert!(body.contains("class='sidebar-link active'>Other</a>"));
    assert!(!body.contains("img"));

    let (_, body) = get(&app, "/sidebar?section=empty").await;
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn render_rebases_links() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/render?file=guide/widgets.md").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h1>Widgets</h1>"));
    assert!(body.contains(r#"src="/docs/guide/img/d.png""#));
    assert!(!body.contains("title: All About Widgets"));

    // Search result paths are accepted as-is.
    let (status, _) = get(&app, "/render?file=/docs/guide/widgets.md").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/render?file=../indexes/index.html").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn password_gate() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/render?file=guide/locked.md").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("confidential"));
    assert!(body.contains("Enter Password"));

    // A password in the query string is ignored.
    let (_, body) =
        get(&app, "/render?file=guide/locked.md&password=secret").await;
    assert!(!body.contains("confidential"));

    let (_, body) =
        post_form(&app, "/render", "file=guide%2Flocked.md&password=wrong").await;
    assert!(!body.contains("confidential"));
    assert!(body.contains("Incorrect password"));

    let (status, body) =
        post_form(&app, "/render", "file=guide%2Flocked.md&password=secret").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("confidential notes"));
    Ok(())
}

#[tokio::test]
async fn download_formats() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/download?file=guide/widgets.md&format=markdown")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"widgets.md\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(
        &body[..],
        b"# Widgets\n\n![diagram](img/d.png)\n\nwidget text\n"
    );

    let (status, body) =
        get(&app, "/download?file=guide/widgets.md&format=html").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h1>Widgets</h1>"));

    let (status, body) =
        get(&app, "/download?file=guide/widgets.md&format=docx").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid format request.");

    let (status, body) =
        get(&app, "/download?file=guide/missing.md&format=html").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid file request.");

    let (status, _) =
        get(&app, "/download?file=guide/locked.md&format=markdown").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = post_form(
        &app,
        "/download",
        "file=guide%2Flocked.md&format=markdown&password=secret",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("confidential notes"));
    Ok(())
}

#[tokio::test]
async fn pdf_failure_is_a_server_error() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = tempfile::tempdir()?;
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    std::fs::write(docs.join("a.md"), "# A\n")?;

    let config = SiteConfig {
        converter: Converter::new(tmp.path().join("missing-converter")),
        ..SiteConfig::default()
    };
    let app = server::router(DocRoot::open(&docs)?, config);

    let (status, body) = get(&app, "/download?file=a.md&format=pdf").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("Failed to generate PDF."));
    assert!(body.contains("missing-converter"));
    Ok(())
}

#[tokio::test]
async fn section_index_pages() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/section?section=guide").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p>guide landing</p>");

    let (_, body) = get(&app, "/section?section=unknown").await;
    assert_eq!(body, "<p>home</p>");

    let (_, body) = get(&app, "/section").await;
    assert_eq!(body, "<p>home</p>");

    let (status, _) = get(&app, "/section?section=..%2Fdocs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn assets_are_served_from_root() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/docs/guide/img/d.png")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let (status, _) = get(&app, "/docs/../indexes/index.html").await;
    assert_ne!(status, StatusCode::OK);

    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    Ok(())
}

#[tokio::test]
async fn protected_markdown_is_not_served_raw() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;

    let (status, body) = get(&app, "/docs/guide/locked.md").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.contains("confidential"));
    assert!(!body.contains("secret"));

    // Search hands out prefixed paths; the locked one still only renders
    // through the password form.
    let (_, lines) = get(&app, "/search?q=locked").await;
    assert!(lines.contains("/docs/guide/locked.md"));

    let (status, body) = get(&app, "/docs/guide/other.md").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("mentions widget"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn protected_markdown_behind_alias_is_not_served() -> Result<(), Box<dyn std::error::Error>>
{
    let tmp = tempfile::tempdir()?;
    let app = setup_site(tmp.path())?;
    let guide = tmp.path().join("docs/guide");
    std::os::unix::fs::symlink(guide.join("locked.md"), guide.join("alias.txt"))?;

    let (status, body) = get(&app, "/docs/guide/alias.txt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.contains("confidential"));
    Ok(())
}

