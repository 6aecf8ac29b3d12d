mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{png, user, ManualClock};
use profile_photo_cache::infrastructure::http::HttpPhotoGateway;
use profile_photo_cache::infrastructure::storage::FileKeyValueStore;
use profile_photo_cache::{KeyValueStore, ProfilePhotoCache};

fn gateway(server: &MockServer) -> Arc<HttpPhotoGateway> {
    Arc::new(
        HttpPhotoGateway::new(
            &format!("{}/api", server.uri()),
            Some("token".to_string()),
            Duration::from_secs(5),
        )
        .expect("gateway"),
    )
}

#[tokio::test]
async fn photo_survives_process_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/U1/photo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base64Image": "Zm9v",
            "mimeType": "image/png",
            "fileSize": 3,
            "lastUpdated": "2024-01-01T00:00:00Z",
            "userId": "U1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let clock = ManualClock::new();

    {
        let store = FileKeyValueStore::new(dir.path().to_path_buf())
            .await
            .expect("store");
        let cache = ProfilePhotoCache::new(user("U1"), gateway(&server), Arc::new(store))
            .with_clock(clock.clone());
        cache.load(false).await.expect("load").expect("photo");
    }

    clock.advance(TimeDelta::minutes(30));
    let reopened = FileKeyValueStore::new(dir.path().to_path_buf())
        .await
        .expect("reopen");
    assert_eq!(
        reopened.get("profile_photo_U1").await.unwrap().as_deref(),
        Some("data:image/png;base64,Zm9v")
    );

    let cache = ProfilePhotoCache::new(user("U1"), gateway(&server), Arc::new(reopened))
        .with_clock(clock.clone());
    let entry = cache.load(false).await.unwrap().unwrap();
    assert_eq!(entry.metadata.last_updated_at, "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn no_content_response_leaves_empty_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/U1/photo"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValueStore::new(dir.path().to_path_buf())
        .await
        .unwrap();
    let cache = ProfilePhotoCache::new(user("U1"), gateway(&server), Arc::new(store));

    assert!(cache.load(false).await.unwrap().is_none());
    assert!(cache.state().error.is_none());
}

#[tokio::test]
async fn server_rejection_during_upload_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users/U1/photo"))
        .respond_with(ResponseTemplate::new(413).set_body_string("payload too large"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValueStore::new(dir.path().to_path_buf())
        .await
        .unwrap();
    let cache = ProfilePhotoCache::new(user("U1"), gateway(&server), Arc::new(store));

    let err = cache.upload(png(b"bar")).await.unwrap_err();
    assert!(err.to_string().contains("413"));
    assert!(cache.state().error.is_some());
}
