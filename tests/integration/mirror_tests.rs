//! Integration tests for the mirror pipeline
//!
//! These tests use wiremock to serve pages and images and run complete
//! mirror operations into a temporary storage root.

use page_mirror::config::Config;
use page_mirror::naming::{MemoryCounterStore, NameCounter};
use page_mirror::{run_mirror, MirrorError, MirrorStage, PageMirror};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

/// Creates a test configuration storing everything below `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.root = dir.path().join("wget_downloads");
    config.http.timeout_secs = 5;
    config.http.connect_timeout_secs = 2;
    config
}

fn host_folder(dir: &TempDir) -> PathBuf {
    dir.path().join("wget_downloads").join("127.0.0.1")
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<!DOCTYPE html><html><head><title>Test</title></head><body>{}</body></html>",
            body
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn png() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(PNG_BYTES)
        .insert_header("content-type", "image/png")
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Starts a server whose responses stop short of their Content-Length
///
/// Returns its base URL.
async fn spawn_truncating_server(content_type: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: 1000\r\nConnection: close\r\n\r\nonly a few bytes",
                    content_type
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn image_folder_entries(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(host_folder(dir).join("img"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {}", path.display(), e))
}

#[tokio::test]
async fn test_mirror_page_with_one_image() {
    let server = MockServer::start().await;
    mount_get(&server, "/", html_page(r#"<img src="/logo.png" alt="Logo">"#)).await;
    mount_get(&server, "/logo.png", png()).await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .expect("mirror should succeed");

    let folder = host_folder(&dir);
    assert_eq!(report.host_folder, folder);
    assert_eq!(report.page_file_name, "1.html");
    assert_eq!(report.page_path, folder.join("1.html"));
    assert_eq!(report.images_found, 1);
    assert_eq!(report.images_saved, 1);
    assert_eq!(report.images_failed, 0);

    let image = std::fs::read(folder.join("img").join("logo.png")).unwrap();
    assert_eq!(image, PNG_BYTES);

    let html = read(&folder.join("1.html"));
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"src="img/logo.png""#));
    assert!(html.contains(r#"alt="Logo""#));
    assert!(!html.contains(r#"src="/logo.png""#));

    // The fallback name advanced the persisted counter
    let counter = read(&dir.path().join("wget_downloads").join("last_site_ID"));
    assert_eq!(counter.trim(), "2");
}

#[tokio::test]
async fn test_failed_image_keeps_original_reference() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/gallery/",
        html_page(r#"<img src="a.png"><img src="/missing.png"><img src="/c.png">"#),
    )
    .await;
    mount_get(&server, "/gallery/a.png", png()).await;
    mount_get(&server, "/missing.png", ResponseTemplate::new(404)).await;
    mount_get(&server, "/c.png", png()).await;

    let dir = TempDir::new().unwrap();
    let url = format!("{}/gallery/", server.uri());
    let report = run_mirror(create_test_config(&dir), &url).await.unwrap();

    assert_eq!(report.images_found, 3);
    assert_eq!(report.images_saved, 2);
    assert_eq!(report.images_failed, 1);

    let folder = host_folder(&dir);
    let html = read(&report.page_path);
    assert!(html.contains(r#"src="img/a.png""#));
    assert!(html.contains(r#"src="/missing.png""#));
    assert!(html.contains(r#"src="img/c.png""#));
    assert!(folder.join("img").join("a.png").exists());
    assert!(folder.join("img").join("c.png").exists());
    assert!(!folder.join("img").join("missing.png").exists());
}

#[tokio::test]
async fn test_named_page_keeps_its_name() {
    let server = MockServer::start().await;
    mount_get(&server, "/docs/report.html", html_page("<p>Quarterly report</p>")).await;

    let dir = TempDir::new().unwrap();
    let counter = MemoryCounterStore::new();
    let mut mirror =
        PageMirror::with_counter(create_test_config(&dir), NameCounter::new(counter.clone()))
            .unwrap();

    let url = format!("{}/docs/report.html?print=1", server.uri());
    let report = mirror.mirror(&url).await.unwrap();

    assert_eq!(report.page_file_name, "report.html");
    assert_eq!(report.images_found, 0);
    assert!(host_folder(&dir).join("report.html").exists());
    assert!(host_folder(&dir).join("img").is_dir());
    assert_eq!(counter.content(), None);
    assert_eq!(mirror.stage(), MirrorStage::Done);
}

#[tokio::test]
async fn test_fallback_names_are_consecutive() {
    let server = MockServer::start().await;
    mount_get(&server, "/", html_page("<p>home</p>")).await;
    mount_get(&server, "/about", html_page("<p>about</p>")).await;

    let dir = TempDir::new().unwrap();
    let counter = MemoryCounterStore::with_content("7\n");
    let mut mirror =
        PageMirror::with_counter(create_test_config(&dir), NameCounter::new(counter.clone()))
            .unwrap();

    let first = mirror.mirror(&server.uri()).await.unwrap();
    let second = mirror
        .mirror(&format!("{}/about", server.uri()))
        .await
        .unwrap();

    assert_eq!(first.page_file_name, "7.html");
    assert_eq!(second.page_file_name, "8.html");
    assert_eq!(counter.content().as_deref(), Some("9"));
    assert!(read(&host_folder(&dir).join("8.html")).contains("about"));
}

#[tokio::test]
async fn test_duplicate_images_downloaded_once() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<img src="/logo.png"><p>text</p><img src="/logo.png">"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(png())
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .unwrap();

    assert_eq!(report.images_found, 2);
    assert_eq!(report.images_saved, 2);
    let html = read(&report.page_path);
    assert_eq!(html.matches(r#"src="img/logo.png""#).count(), 2);
}

#[tokio::test]
async fn test_base_href_used_for_images() {
    let server = MockServer::start().await;
    let page = format!(
        r#"<html><head><base href="{}/static/"></head><body><img src="pic.png"></body></html>"#,
        server.uri()
    );
    mount_get(
        &server,
        "/",
        ResponseTemplate::new(200)
            .set_body_string(page)
            .insert_header("content-type", "text/html"),
    )
    .await;
    mount_get(&server, "/static/pic.png", png()).await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .unwrap();

    assert_eq!(report.images_saved, 1);
    assert!(host_folder(&dir).join("img").join("pic.png").exists());
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), "   ").await;

    assert!(matches!(result, Err(MirrorError::InvalidInput)));
    assert!(!dir.path().join("wget_downloads").exists());
}

#[tokio::test]
async fn test_unsupported_scheme_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), "ftp://example.com/file.txt").await;

    assert!(matches!(result, Err(MirrorError::MalformedUrl(_))));
    assert!(!dir.path().join("wget_downloads").exists());
}

#[tokio::test]
async fn test_http_error_fails_mirror() {
    let server = MockServer::start().await;
    mount_get(&server, "/", ResponseTemplate::new(500)).await;

    let dir = TempDir::new().unwrap();
    let mut mirror = PageMirror::with_counter(
        create_test_config(&dir),
        NameCounter::new(MemoryCounterStore::new()),
    )
    .unwrap();

    let result = mirror.mirror(&server.uri()).await;

    assert!(matches!(
        result,
        Err(MirrorError::HttpStatus { status: 500, .. })
    ));
    assert_eq!(mirror.stage(), MirrorStage::Failed);
    assert!(!host_folder(&dir).exists());
}

#[tokio::test]
async fn test_non_html_content_is_rejected() {
    let server = MockServer::start().await;
    mount_get(&server, "/", png()).await;

    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), &server.uri()).await;

    match result {
        Err(MirrorError::UnsupportedContent { content_type, .. }) => {
            assert_eq!(content_type, "image/png");
        }
        other => panic!("expected UnsupportedContent, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind and drop a listener so the port is known to be closed
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), &format!("127.0.0.1:{}", port)).await;

    assert!(
        matches!(result, Err(MirrorError::ConnectionFailure { .. })),
        "unexpected result: {:?}",
        result
    );
    assert!(!dir.path().join("wget_downloads").exists());
}

#[tokio::test]
async fn test_meta_charset_page_saved_as_utf8() {
    let server = MockServer::start().await;
    let body: &[u8] =
        b"<html><head><meta charset=\"iso-8859-1\"><title>Caf\xe9</title></head><body><p>cr\xe8me br\xfbl\xe9e</p></body></html>";
    mount_get(
        &server,
        "/",
        ResponseTemplate::new(200)
            .set_body_bytes(body)
            .insert_header("content-type", "text/html"),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .unwrap();

    let html = read(&report.page_path);
    assert!(html.contains("<title>Café</title>"));
    assert!(html.contains("crème brûlée"));
    assert!(!html.contains('\u{FFFD}'));
    assert!(html.contains(r#"charset="utf-8""#));
}

#[tokio::test]
async fn test_failed_same_name_image_keeps_earlier_file() {
    let server = MockServer::start().await;
    let truncating = spawn_truncating_server("image/png").await;
    mount_get(
        &server,
        "/",
        html_page(&format!(
            r#"<img src="/a/logo.png"><img src="{}/b/logo.png">"#,
            truncating
        )),
    )
    .await;
    mount_get(&server, "/a/logo.png", png()).await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .unwrap();

    assert_eq!(report.images_saved, 1);
    assert_eq!(report.images_failed, 1);

    let html = read(&report.page_path);
    assert!(html.contains(r#"src="img/logo.png""#));
    assert!(html.contains(&format!(r#"src="{}/b/logo.png""#, truncating)));

    let saved = std::fs::read(host_folder(&dir).join("img").join("logo.png")).unwrap();
    assert_eq!(saved, PNG_BYTES);
    assert_eq!(image_folder_entries(&dir), vec!["logo.png".to_string()]);
}

#[tokio::test]
async fn test_truncated_image_leaves_no_file() {
    let server = MockServer::start().await;
    let truncating = spawn_truncating_server("image/png").await;
    let source = format!("{}/broken.png", truncating);
    mount_get(&server, "/", html_page(&format!(r#"<img src="{}">"#, source))).await;

    let dir = TempDir::new().unwrap();
    let report = run_mirror(create_test_config(&dir), &server.uri())
        .await
        .unwrap();

    assert_eq!(report.images_saved, 0);
    assert_eq!(report.images_failed, 1);
    assert!(image_folder_entries(&dir).is_empty());
    assert!(read(&report.page_path).contains(&format!(r#"src="{}""#, source)));
}

#[tokio::test]
async fn test_truncated_page_is_stream_failure() {
    let truncating = spawn_truncating_server("text/html").await;

    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), &truncating).await;

    assert!(
        matches!(result, Err(MirrorError::ProtocolStreamFailure { .. })),
        "unexpected result: {:?}",
        result
    );
    assert!(!dir.path().join("wget_downloads").exists());
}

#[tokio::test]
async fn test_unknown_host_is_unresolved() {
    let dir = TempDir::new().unwrap();
    let result = run_mirror(create_test_config(&dir), "no-such-host.invalid").await;

    assert!(
        matches!(result, Err(MirrorError::UnresolvedHost { .. })),
        "unexpected result: {:?}",
        result
    );
    assert!(!dir.path().join("wget_downloads").exists());
}
