use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use relay_axum::RelayApp;
use relay_server::{build, open_store, verify_storage, LocalStore, ServerConfig};
use relay_stream::{
    CredentialId, ObjectResolver, PartitionId, RelayError, RelayResult, RemoteObjectRef,
    RemoteStore, ResolvedObject,
};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

const INTRO: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FAR: &[u8] = b"remote partition payload";

fn store_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    dir
}

fn populate(root: &Path) {
    std::fs::create_dir_all(root.join("media")).unwrap();
    std::fs::write(root.join("media/intro.mp4"), INTRO).unwrap();
    std::fs::write(root.join("far.pdf"), FAR).unwrap();

    let index = json!({
        "intro": {
            "partition": 1, "object_id": 17, "access_hash": 99,
            "kind": "video", "file_name": "intro.mp4", "mime_type": "video/mp4",
            "path": "media/intro.mp4"
        },
        "far": {
            "partition": 3, "object_id": 18, "access_hash": 5,
            "file_name": "far.pdf", "mime_type": "application/pdf",
            "path": "far.pdf"
        },
        "ghost": {
            "partition": 1, "object_id": 19, "path": "missing.bin"
        }
    });
    std::fs::write(root.join("index.json"), index.to_string()).unwrap();
}

fn config_for(dir: &TempDir) -> ServerConfig {
    ServerConfig::from_vars(vec![
        ("STORE_ROOT".to_string(), dir.path().display().to_string()),
        ("PRIMARY_TOKEN".to_string(), "primary".to_string()),
        ("MULTI_TOKEN_1".to_string(), "aux".to_string()),
        ("RELAY__CHUNK_SIZE".to_string(), "8".to_string()),
        ("STORAGE_VERIFY_RETRIES".to_string(), "1".to_string()),
    ])
    .unwrap()
}

async fn app(dir: &TempDir) -> RelayApp {
    build(&config_for(dir)).await.unwrap()
}

async fn send(app: &RelayApp, uri: &str, range: Option<&str>) -> Response {
    let mut request = Request::builder().uri(uri);
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    app.router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body(res: Response) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

#[tokio::test]
async fn serves_full_file_and_ranges() {
    let dir = store_dir();
    let app = app(&dir).await;
    assert_eq!(app.relay.pool().ids(), vec![CredentialId(0), CredentialId(1)]);

    let res = send(&app, "/dl/intro/intro.mp4", None).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(body(res).await, INTRO.to_vec());

    let res = send(&app, "/dl/intro/intro.mp4", Some("bytes=5-20")).await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 5-20/36");
    assert_eq!(body(res).await, INTRO[5..=20].to_vec());
}

#[tokio::test]
async fn foreign_partition_is_served_through_handoff() {
    let dir = store_dir();
    let app = app(&dir).await;

    let res = send(&app, "/dl/far", Some("bytes=7-")).await;

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"far.pdf\""
    );
    assert_eq!(body(res).await, FAR[7..].to_vec());
    assert_eq!(app.relay.sessions().len(), 1);
}

#[tokio::test]
async fn encoded_handles_resolve_through_the_index() {
    let dir = store_dir();
    let app = app(&dir).await;

    let handle = RemoteObjectRef::new(PartitionId(1), 17, 99).encode().unwrap();
    let res = send(&app, &format!("/dl/{handle}/clip.mp4"), Some("bytes=0-3")).await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body(res).await, b"0123".to_vec());

    let wrong_hash = RemoteObjectRef::new(PartitionId(1), 17, 1).encode().unwrap();
    let res = send(&app, &format!("/dl/{wrong_hash}/clip.mp4"), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = store_dir();
    let app = app(&dir).await;

    let res = send(&app, "/dl/ghost/x.bin", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = send(&app, "/dl/unknown/x.bin", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn build_fails_without_index() {
    let dir = tempfile::tempdir().unwrap();
    let err = build(&config_for(&dir)).await.err().unwrap();
    assert!(err.to_string().contains("Failed to open store"));
}

#[tokio::test]
async fn store_root_that_appears_late_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("mounted-later");

    let late_root = root.clone();
    let mount = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        populate(&late_root);
    });

    let started = Instant::now();
    let store = open_store(&root, 50, Duration::from_millis(20)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(store.len(), 3);
    mount.await.unwrap();
}

#[tokio::test]
async fn build_waits_for_missing_store_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("not-yet");
    let config = ServerConfig::from_vars(vec![
        ("STORE_ROOT".to_string(), root.display().to_string()),
        ("PRIMARY_TOKEN".to_string(), "primary".to_string()),
        ("STORAGE_VERIFY_RETRIES".to_string(), "5".to_string()),
        ("STORAGE_VERIFY_DELAY_SECS".to_string(), "1".to_string()),
    ])
    .unwrap();

    let late_root = root.clone();
    let mount = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        populate(&late_root);
    });

    let started = Instant::now();
    let app = build(&config).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(1));
    mount.await.unwrap();

    let res = send(&app, "/dl/intro/intro.mp4", Some("bytes=0-3")).await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body(res).await, b"0123".to_vec());
}

#[tokio::test]
async fn missing_store_root_gives_up_after_retries() {
    let dir = tempfile::tempdir().unwrap();
    let err = open_store(&dir.path().join("never"), 3, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Io { .. }));
}

#[tokio::test]
async fn fetch_rejects_wrong_access_hash() {
    let dir = store_dir();
    let store = LocalStore::open(dir.path()).await.unwrap();
    assert_eq!(store.len(), 3);

    let session = store.primary_session(CredentialId(0)).await.unwrap();
    let good = RemoteObjectRef::new(PartitionId(1), 17, 99);
    let bytes = store.fetch_chunk(&session, &good, 30, 100).await.unwrap();
    assert_eq!(&bytes[..], &INTRO[30..]);

    let bad = RemoteObjectRef::new(PartitionId(1), 17, 98);
    assert!(store.fetch_chunk(&session, &bad, 0, 8).await.is_err());

    let past_end = store.fetch_chunk(&session, &good, 100, 8).await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn unauthorized_session_cannot_fetch() {
    let dir = store_dir();
    let store = LocalStore::open(dir.path()).await.unwrap();

    let session = store.open_session(CredentialId(0), PartitionId(3)).await.unwrap();
    let far = RemoteObjectRef::new(PartitionId(3), 18, 5);
    assert!(store.fetch_chunk(&session, &far, 0, 8).await.is_err());

    let home = store.primary_session(CredentialId(0)).await.unwrap();
    let token = store.export_authorization(&home, PartitionId(3)).await.unwrap();
    store.import_authorization(&session, token).await.unwrap();
    let bytes = store.fetch_chunk(&session, &far, 0, 8).await.unwrap();
    assert_eq!(&bytes[..], &FAR[..8]);
}

struct FlakyStorage {
    failures_left: AtomicUsize,
}

#[async_trait::async_trait]
impl ObjectResolver for FlakyStorage {
    async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject> {
        Err(RelayError::not_found(handle))
    }

    async fn probe(&self) -> RelayResult<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(RelayError::backend_msg("storage unreachable"))
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn storage_verification_retries() {
    let flaky = FlakyStorage {
        failures_left: AtomicUsize::new(2),
    };
    assert!(verify_storage(&flaky, 3, Duration::from_millis(1)).await.is_ok());

    let flaky = FlakyStorage {
        failures_left: AtomicUsize::new(2),
    };
    assert!(verify_storage(&flaky, 2, Duration::from_millis(1)).await.is_err());
}
