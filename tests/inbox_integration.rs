//! End-to-end tests against a fake signal-cli REST API.
//!
//! Each test spins up an Axum server on a random port that serves a fixed
//! receive batch and attachment blobs, then runs the real `HttpRelay` and
//! `InboxProcessor` against it with a temporary inbox directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use signal_inbox::config::InboxConfig;
use signal_inbox::inbox::{InboxProcessor, RunSummary};
use signal_inbox::relay::{HttpRelay, Relay};

const USER_NUMBER: &str = "+15555550101";
const BOT_NUMBER: &str = "+15555559999";

/// A 1x1 transparent PNG.
const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[derive(Default)]
struct FakeRelay {
    batch: Value,
    blobs: HashMap<String, Vec<u8>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeRelay {
    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

async fn receive(
    State(relay): State<Arc<FakeRelay>>,
    UrlPath(account): UrlPath<String>,
) -> Result<axum::Json<Value>, StatusCode> {
    if account != BOT_NUMBER {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(axum::Json(relay.batch.clone()))
}

async fn fetch_attachment(
    State(relay): State<Arc<FakeRelay>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Vec<u8>, StatusCode> {
    relay.blobs.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn delete_attachment(
    State(relay): State<Arc<FakeRelay>>,
    UrlPath(id): UrlPath<String>,
) -> StatusCode {
    relay.deleted.lock().unwrap().push(id);
    StatusCode::NO_CONTENT
}

/// Start the fake relay on a random port, return its base URL.
async fn start_relay(relay: Arc<FakeRelay>) -> String {
    let app = Router::new()
        .route("/v1/receive/{account}", get(receive))
        .route(
            "/v1/attachments/{id}",
            get(fetch_attachment).delete(delete_attachment),
        )
        .with_state(relay);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

fn config(inbox: &Path, host: &str) -> InboxConfig {
    InboxConfig {
        inbox_dir: inbox.to_path_buf(),
        relay_host: host.to_string(),
        account: BOT_NUMBER.to_string(),
        note_extension: "md".to_string(),
        backup_dir: inbox.join("backups"),
        ..InboxConfig::default()
    }
}

/// Receive one batch from the relay and process it, like the binary does.
async fn run_once(config: InboxConfig) -> RunSummary {
    let relay = Arc::new(HttpRelay::new(&config.relay_host, &config.account));
    let processor = InboxProcessor::new(config, relay.clone());
    let batch = relay.receive().await.expect("fake relay serves a batch");
    let summary = processor.process_value(batch).await;
    processor.wait_for_backup().await;
    summary
}

fn inbox_files(inbox: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(inbox)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn text_batch(text: &str) -> Value {
    json!([{
        "envelope": {
            "source": USER_NUMBER,
            "sourceNumber": USER_NUMBER,
            "sourceUuid": "6a3c0d2e-uuid",
            "sourceDevice": 1,
            "timestamp": 1_700_000_000_000u64,
            "dataMessage": {
                "timestamp": 1_700_000_000_000u64,
                "message": text,
                "expiresInSeconds": 0
            }
        },
        "account": BOT_NUMBER
    }])
}

fn image_batch() -> Value {
    json!([{
        "envelope": {
            "sourceNumber": USER_NUMBER,
            "dataMessage": {
                "message": "signal-cli-api docker setup",
                "attachments": [{
                    "contentType": "image/png",
                    "filename": "setup.png",
                    "id": "Xh3kqP0vAbc.png",
                    "size": PNG.len()
                }]
            }
        },
        "account": BOT_NUMBER
    }])
}

#[tokio::test]
async fn note_with_title_and_body() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: text_batch("Website yaks: - testing"),
        ..FakeRelay::default()
    });
    let host = start_relay(relay).await;

    let summary = run_once(config(inbox.path(), &host)).await;

    assert_eq!(inbox_files(inbox.path()), vec!["Website yaks.md"]);
    let contents = std::fs::read_to_string(inbox.path().join("Website yaks.md")).unwrap();
    assert!(contents.contains("Website yaks"));
    assert!(contents.contains("- testing"));
    assert_eq!(summary.parsed_count, 1);
    assert_eq!(summary.created_files, vec!["Website yaks.md"]);
}

#[tokio::test]
async fn same_note_in_two_runs_is_created_then_appended() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: text_batch("Website yaks: - testing"),
        ..FakeRelay::default()
    });
    let host = start_relay(relay).await;

    let first = run_once(config(inbox.path(), &host)).await;
    let second = run_once(config(inbox.path(), &host)).await;

    assert_eq!(first.created_files, vec!["Website yaks.md"]);
    assert!(first.appended_files.is_empty());
    assert!(second.created_files.is_empty());
    assert_eq!(second.appended_files, vec!["Website yaks.md"]);

    let contents = std::fs::read_to_string(inbox.path().join("Website yaks.md")).unwrap();
    assert_eq!(contents, "Website yaks: - testing\n - testing\n");
}

#[tokio::test]
async fn image_attachment_named_after_message() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: image_batch(),
        blobs: HashMap::from([("Xh3kqP0vAbc.png".to_string(), PNG.to_vec())]),
        ..FakeRelay::default()
    });
    let host = start_relay(Arc::clone(&relay)).await;

    let summary = run_once(config(inbox.path(), &host)).await;

    let filename = "signal-cli-api docker setup.png";
    assert_eq!(inbox_files(inbox.path()), vec![filename]);
    assert_eq!(std::fs::read(inbox.path().join(filename)).unwrap(), PNG);
    assert_eq!(summary.created_files, vec![filename]);
    assert_eq!(relay.deleted(), vec!["Xh3kqP0vAbc.png"]);
}

#[tokio::test]
async fn kept_attachment_stays_on_relay() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: image_batch(),
        blobs: HashMap::from([("Xh3kqP0vAbc.png".to_string(), PNG.to_vec())]),
        ..FakeRelay::default()
    });
    let host = start_relay(Arc::clone(&relay)).await;

    run_once(InboxConfig {
        keep_attachments: true,
        ..config(inbox.path(), &host)
    })
    .await;

    assert!(inbox.path().join("signal-cli-api docker setup.png").exists());
    assert!(relay.deleted().is_empty());
}

#[tokio::test]
async fn non_whitelisted_sender_is_ignored() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: image_batch(),
        blobs: HashMap::from([("Xh3kqP0vAbc.png".to_string(), PNG.to_vec())]),
        ..FakeRelay::default()
    });
    let host = start_relay(Arc::clone(&relay)).await;

    let summary = run_once(InboxConfig {
        whitelist: Some(vec!["+15555550999".to_string()]),
        ..config(inbox.path(), &host)
    })
    .await;

    assert_eq!(summary.parsed_count, 1);
    assert_eq!(summary.ignored_count, 1);
    assert!(summary.created_files.is_empty());
    assert!(inbox_files(inbox.path()).is_empty());
    assert_eq!(relay.deleted(), vec!["Xh3kqP0vAbc.png"]);
}

#[tokio::test]
async fn long_untitled_body_is_cut() {
    let inbox = tempfile::tempdir().unwrap();
    let body = "abcdefghij".repeat(12);
    let relay = Arc::new(FakeRelay {
        batch: text_batch(&body),
        ..FakeRelay::default()
    });
    let host = start_relay(relay).await;

    let summary = run_once(config(inbox.path(), &host)).await;

    let expected = format!("{}….md", &body[..60]);
    assert_eq!(summary.created_files, vec![expected.clone()]);
    let contents = std::fs::read_to_string(inbox.path().join(&expected)).unwrap();
    assert_eq!(contents, format!("{body}\n"));
}

#[tokio::test]
async fn missing_blob_is_logged_and_not_deleted() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: image_batch(),
        ..FakeRelay::default()
    });
    let host = start_relay(Arc::clone(&relay)).await;

    let summary = run_once(config(inbox.path(), &host)).await;

    assert!(summary.created_files.is_empty());
    assert!(relay.deleted().is_empty());
    let files = inbox_files(inbox.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("signal-api-errors-"));
    let log = std::fs::read_to_string(inbox.path().join(&files[0])).unwrap();
    assert!(log.contains("404"));
}

#[tokio::test]
async fn backup_snapshot_written() {
    let inbox = tempfile::tempdir().unwrap();
    let relay = Arc::new(FakeRelay {
        batch: text_batch("backed up"),
        ..FakeRelay::default()
    });
    let host = start_relay(Arc::clone(&relay)).await;

    run_once(InboxConfig {
        backup_messages: true,
        ..config(inbox.path(), &host)
    })
    .await;

    let backups: Vec<_> = std::fs::read_dir(inbox.path().join("backups"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(backups.len(), 1);
    let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("messages-"));
    let restored: Value =
        serde_json::from_str(&std::fs::read_to_string(&backups[0]).unwrap()).unwrap();
    assert_eq!(restored, relay.batch);
}

#[tokio::test]
async fn unreachable_relay_fails_receive() {
    let relay = HttpRelay::new("http://127.0.0.1:9", BOT_NUMBER);
    assert!(relay.receive().await.is_err());
}
