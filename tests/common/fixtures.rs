//! Mock provider endpoints

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Deterministic stand-in for a video file
pub fn video_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 253) as u8).collect()
}

/// Mount a Pika-style job that is processing once, then completed
///
/// Returns the artifact bytes served at `/cdn/x.mp4`.
pub async fn mount_pika_job(server: &MockServer, job_id: &str, token: &str) -> Vec<u8> {
    let body = video_bytes(64 * 1024 + 17);
    let auth = format!("Bearer {token}");

    Mock::given(method("POST"))
        .and(path("/v1/generate"))
        .and(header("authorization", auth.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": job_id})))
        .expect(1)
        .mount(server)
        .await;

    let status_path = format!("/v1/jobs/{job_id}");
    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .and(header("authorization", auth.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": job_id, "status": "processing"})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(status_path.as_str()))
        .and(header("authorization", auth.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": job_id,
            "status": "completed",
            "video": {"url": format!("{}/cdn/x.mp4", server.uri()), "duration": 5}
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cdn/x.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(server)
        .await;

    body
}
