//! Integration tests for downloading results into the output directory.

use std::collections::HashSet;

use reelgen::generator::{sanitize_filename, Materializer, MAX_BASE_NAME_CHARS};
use reelgen::Error;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: &[u8]) -> String {
    Mock::given(method("GET"))
        .and(path(route.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

/// Serve a single response that declares `declared_len` bytes, sends only
/// `body`, then closes the connection.
async fn serve_truncated(route: &str, declared_len: usize, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        // Consume the whole request head so closing does not reset the connection
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: video/mp4\r\nContent-Length: {}\r\n\r\n",
            declared_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.flush().await.unwrap();
    });

    format!("http://{}{}", addr, route)
}

#[tokio::test]
async fn test_first_download_uses_bare_name() {
    let server = MockServer::start().await;
    let url = serve(&server, "/v/cat.mp4", b"cat video").await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let file = materializer.materialize(&url, "A cat!!").await.unwrap();

    assert_eq!(file.path, output.path().join("A cat__.mp4"));
    assert_eq!(std::fs::read(&file.path).unwrap(), b"cat video");
}

#[tokio::test]
async fn test_repeated_prompt_gets_suffix_and_keeps_first_file() {
    let server = MockServer::start().await;
    let first_url = serve(&server, "/v/first.mp4", b"first").await;
    let second_url = serve(&server, "/v/second.mp4", b"second").await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let first = materializer.materialize(&first_url, "A cat!!").await.unwrap();
    let second = materializer.materialize(&second_url, "A cat!!").await.unwrap();

    assert_eq!(first.path, output.path().join("A cat__.mp4"));
    assert_eq!(second.path, output.path().join("A cat___1.mp4"));
    assert_eq!(std::fs::read(&first.path).unwrap(), b"first");
    assert_eq!(std::fs::read(&second.path).unwrap(), b"second");
}

#[tokio::test]
async fn test_many_downloads_never_overwrite() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let mut seen = HashSet::new();
    for i in 0..6 {
        let body = format!("video #{}", i);
        let url = serve(&server, &format!("/v/{}.mp4", i), body.as_bytes()).await;
        let file = materializer.materialize(&url, "same prompt").await.unwrap();
        assert!(seen.insert(file.path.clone()), "path reused: {:?}", file.path);
        assert_eq!(std::fs::read_to_string(&file.path).unwrap(), body);
    }

    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 6);
}

#[tokio::test]
async fn test_concurrent_downloads_of_same_prompt_are_distinct() {
    let server = MockServer::start().await;
    let url = serve(&server, "/v/shared.mp4", b"shared").await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let m = materializer.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            m.materialize(&url, "race").await
        }));
    }

    let mut paths = HashSet::new();
    for handle in handles {
        let file = handle.await.unwrap().unwrap();
        assert_eq!(std::fs::read(&file.path).unwrap(), b"shared");
        paths.insert(file.path);
    }
    assert_eq!(paths.len(), 5);
}

#[tokio::test]
async fn test_long_prompt_is_truncated_in_filename() {
    let server = MockServer::start().await;
    let url = serve(&server, "/v/long.mp4", b"long").await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let prompt = "A very long cinematic prompt about mountains, rivers, and a lone eagle at dawn";
    let file = materializer.materialize(&url, prompt).await.unwrap();

    let stem = file.path.file_stem().unwrap().to_string_lossy().to_string();
    assert_eq!(stem.chars().count(), MAX_BASE_NAME_CHARS);
    assert_eq!(stem, sanitize_filename(prompt));
}

#[tokio::test]
async fn test_http_error_is_download_error_and_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v/missing.mp4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let result = materializer
        .materialize(&format!("{}/v/missing.mp4", server.uri()), "gone")
        .await;

    assert!(matches!(result, Err(Error::Download { .. })));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unreachable_host_is_download_error() {
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    let result = materializer
        .materialize("http://127.0.0.1:9/never.mp4", "offline")
        .await;

    assert!(matches!(result, Err(Error::Download { .. })));
}

#[tokio::test]
async fn test_creates_missing_output_directory() {
    let server = MockServer::start().await;
    let url = serve(&server, "/v/new.mp4", b"new").await;
    let output = TempDir::new().unwrap();
    let nested = output.path().join("videos").join("2026");
    let materializer = Materializer::new(&nested).unwrap();

    let file = materializer.materialize(&url, "fresh").await.unwrap();

    assert_eq!(file.path, nested.join("fresh.mp4"));
    assert!(file.path.exists());
}

#[tokio::test]
async fn test_interrupted_transfer_is_download_error_and_keeps_partial_file() {
    let url = serve_truncated("/v/cut.mp4", 1000, b"partial").await;
    let output = TempDir::new().unwrap();
    let materializer = Materializer::new(output.path()).unwrap();

    match materializer.materialize(&url, "cut").await {
        Err(Error::Download { message }) => {
            assert!(message.contains("transfer interrupted"), "{}", message)
        }
        other => panic!("expected Download error, got {:?}", other),
    }

    // The partial file stays where it was written
    let names: Vec<String> = std::fs::read_dir(output.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["cut.mp4".to_string()]);
}
