//! Streaming artifact download

use crate::error::Result;
use futures::StreamExt;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Size of the write buffer between the network stream and the file
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Stream `url` into `destination`, creating parent directories as needed
///
/// The body is never held in memory as a whole: network chunks pass through an
/// 8 KiB buffered writer. Returns the number of bytes written.
///
/// # Errors
///
/// A non-success status fails before the destination is touched. A failure
/// while streaming leaves the partially written file in place.
pub async fn fetch_artifact(client: &reqwest::Client, url: &Url, destination: &Path) -> Result<u64> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = tokio::fs::File::create(destination).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;

    tracing::debug!(url = %url, path = %destination.display(), bytes = written, "artifact saved");
    Ok(written)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artifact_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[tokio::test]
    async fn fetched_file_is_byte_identical() {
        let mock_server = MockServer::start().await;
        let body = artifact_bytes(100_003);
        Mock::given(method("GET"))
            .and(path("/cdn/x.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("nested/out/video.mp4");
        let url = Url::parse(&format!("{}/cdn/x.mp4", mock_server.uri())).unwrap();

        let written = fetch_artifact(&reqwest::Client::new(), &url, &destination)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        let saved = tokio::fs::read(&destination).await.unwrap();
        assert_eq!(saved.len(), body.len());
        assert_eq!(saved, body);
    }

    #[tokio::test]
    async fn empty_artifact_produces_empty_file() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("empty.mp4");
        let url = Url::parse(&mock_server.uri()).unwrap();

        let written = fetch_artifact(&reqwest::Client::new(), &url, &destination)
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(destination.exists());
    }

    #[tokio::test]
    async fn http_error_is_transport_error_and_writes_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("missing/video.mp4");
        let url = Url::parse(&format!("{}/gone.mp4", mock_server.uri())).unwrap();

        let err = fetch_artifact(&reqwest::Client::new(), &url, &destination)
            .await
            .unwrap_err();

        match err {
            Error::Transport(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(404)),
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(!destination.exists());
        assert!(!temp_dir.path().join("missing").exists());
    }

    #[tokio::test]
    async fn existing_file_is_overwritten() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&mock_server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("video.mp4");
        tokio::fs::write(&destination, b"an older, longer video").await.unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap();

        fetch_artifact(&reqwest::Client::new(), &url, &destination)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&destination).await.unwrap(), b"new");
    }
}
