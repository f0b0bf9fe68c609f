//! Integration tests for drill-music HTTP endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use drill_music::services::{BackendAvailability, MusicAnalyzer, NativeBackend, SignalBackend};
use drill_music::AppState;
use helpers::{generate_test_wav, AudioConfig, ScriptedBackend};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "drill-test-boundary";

/// One multipart form field
enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: Option<&'a str>,
        bytes: &'a [u8],
    },
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                bytes,
            } => {
                let disposition = match filename {
                    Some(filename) => format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    ),
                    None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
                };
                body.extend_from_slice(disposition.as_bytes());
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn create_test_app(backend: Arc<dyn SignalBackend>, availability: BackendAvailability) -> Router {
    let analyzer = MusicAnalyzer::new(backend, availability, Duration::from_secs(60));
    drill_music::build_router(AppState::new(analyzer, 16 * 1024 * 1024))
}

fn native_app(availability: BackendAvailability) -> Router {
    create_test_app(Arc::new(NativeBackend::new()), availability)
}

async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn silent_wav_bytes(seconds: f64) -> Vec<u8> {
    let temp_dir = TempDir::new().unwrap();
    let config = AudioConfig {
        duration_seconds: seconds,
        ..Default::default()
    };
    let path = generate_test_wav(&temp_dir.path().join("silence.wav"), &config).unwrap();
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = native_app(BackendAvailability::Unavailable);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "drill-music");
    assert_eq!(json["backend_available"], false);
    assert!(json["uptime_seconds"].is_u64());
    assert_eq!(
        json["features"],
        serde_json::json!(["music-analysis", "music-markers"])
    );
}

#[tokio::test]
async fn test_analyze_quick_silence() {
    let wav = silent_wav_bytes(10.0);
    let app = native_app(BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/analyze",
        &[Part::File {
            name: "file",
            filename: Some("silence.wav"),
            bytes: &wav,
        }],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "quick");
    assert_eq!(json["bpm"], 120.0);
    assert_eq!(json["time_signature"], "4/4");
    assert_eq!(json["beats"].as_array().unwrap().len(), 20);
    assert!((json["duration"].as_f64().unwrap() - 10.0).abs() < 0.01);
    assert!(json["sections"].is_null());
    assert!(json["tempo_changes"].is_null());
}

#[tokio::test]
async fn test_analyze_full_with_backend_unavailable() {
    let bytes = vec![7u8; 2 * 1_048_576];
    let app = native_app(BackendAvailability::Unavailable);

    // Mode after the file part
    let (status, json) = post_multipart(
        app,
        "/music/analyze",
        &[
            Part::File {
                name: "file",
                filename: Some("song.mp3"),
                bytes: &bytes,
            },
            Part::Text("mode", "full"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "full");
    assert_eq!(json["duration"], 120.0);
    assert_eq!(json["beats"].as_array().unwrap().len(), 241);
    assert!(json["sections"].is_null());
    assert_eq!(json["tempo_changes"], serde_json::json!([]));
}

#[tokio::test]
async fn test_invalid_mode_rejected_before_analysis() {
    let backend = Arc::new(ScriptedBackend::failing(10.0));
    let app = create_test_app(backend.clone(), BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/analyze",
        &[
            Part::Text("mode", "medium"),
            Part::File {
                name: "file",
                filename: Some("song.wav"),
                bytes: b"RIFF....",
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"].as_str().unwrap().contains("medium"));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let backend = Arc::new(ScriptedBackend::failing(10.0));
    let app = create_test_app(backend.clone(), BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/analyze",
        &[Part::File {
            name: "file",
            filename: Some("empty.mp3"),
            bytes: b"",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_missing_filename_rejected() {
    let app = native_app(BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/analyze",
        &[Part::File {
            name: "file",
            filename: None,
            bytes: b"data",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("filename"));
}

#[tokio::test]
async fn test_missing_file_rejected() {
    let app = native_app(BackendAvailability::Available);

    let (status, _) = post_multipart(app, "/music/analyze", &[Part::Text("mode", "quick")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_markers_from_fallback_analysis() {
    let bytes = vec![1u8; 1_048_576];
    let app = native_app(BackendAvailability::Unavailable);

    let (status, json) = post_multipart(
        app,
        "/music/markers?interval=4",
        &[Part::File {
            name: "file",
            filename: Some("song.mp3"),
            bytes: &bytes,
        }],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bpm"], 120.0);
    // 60 s estimated, one marker every 2 s
    assert_eq!(json["total_markers"], 30);
    let markers = json["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 30);
    assert_eq!(markers[0]["time"], 0.0);
    assert_eq!(markers[0]["count"], 0.0);
    assert_eq!(markers[1]["time"], 2.0);
    assert_eq!(markers[1]["count"], 4.0);
}

#[tokio::test]
async fn test_markers_default_interval() {
    let wav = silent_wav_bytes(4.0);
    let app = native_app(BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/markers",
        &[Part::File {
            name: "file",
            filename: Some("short.wav"),
            bytes: &wav,
        }],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let times: Vec<f64> = json["markers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["time"].as_f64().unwrap())
        .collect();
    assert_eq!(times, vec![0.0, 2.0]);
}

#[tokio::test]
async fn test_markers_invalid_interval() {
    let backend = Arc::new(ScriptedBackend::failing(10.0));
    let app = create_test_app(backend.clone(), BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/markers?interval=0",
        &[Part::File {
            name: "file",
            filename: Some("song.wav"),
            bytes: b"data",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_interval_is_json_error() {
    let backend = Arc::new(ScriptedBackend::failing(10.0));
    let app = create_test_app(backend.clone(), BackendAvailability::Available);

    let (status, json) = post_multipart(
        app,
        "/music/markers?interval=abc",
        &[Part::File {
            name: "file",
            filename: Some("song.wav"),
            bytes: b"data",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"].is_string());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_non_multipart_body_is_json_error() {
    let app = native_app(BackendAvailability::Available);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/music/analyze")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"mode":"quick"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
