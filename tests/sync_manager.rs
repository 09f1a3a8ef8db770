//! Sync manager behavior against a mock server: the full-then-delta merge
//! flow and single-flight deduplication of concurrent syncs.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{SID, client_for, mount_login};
use qbit_sync::manager::{SyncManager, SyncOptions, SyncOptionsBuilder};
use qbit_sync::models::TorrentState;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn full_update_then_delta_preserves_unmentioned_fields() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rid": 1,
            "full_update": true,
            "torrents": {
                "abc123": {
                    "hash": "abc123",
                    "name": "Test",
                    "progress": 0.5,
                    "dlspeed": 1000,
                    "upspeed": 500,
                    "category": "test",
                    "state": "downloading"
                }
            },
            "tags": ["linux"],
            "server_state": { "dl_info_speed": 1000, "alltime_dl": 9000 }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .and(query_param("rid", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rid": 2,
            "torrents": {
                "abc123": { "dlspeed": 0, "state": "stalledDL" }
            },
            "server_state": { "dl_info_speed": 0, "alltime_dl": 0 }
        })))
        .mount(&server)
        .await;

    let manager = SyncManager::new(client_for(&server), SyncOptions::default());
    manager.sync().await.expect("initial sync");
    assert_eq!(manager.rid().await, 1);

    let torrent = manager.torrent_unchecked("abc123").await.unwrap();
    assert_eq!(torrent.name, "Test");
    assert_eq!(torrent.dlspeed, 1000);

    manager.sync().await.expect("delta sync");
    assert_eq!(manager.rid().await, 2);

    let torrent = manager.torrent_unchecked("abc123").await.unwrap();
    // the delta zeroed the speed but did not mention the rest
    assert_eq!(torrent.dlspeed, 0);
    assert_eq!(torrent.state, TorrentState::StalledDl);
    assert_eq!(torrent.name, "Test");
    assert_eq!(torrent.upspeed, 500);
    assert_eq!(torrent.category, "test");

    let state = manager.server_state_unchecked().await.unwrap();
    assert_eq!(state.dl_info_speed, 0);
    // cumulative totals never go backwards
    assert_eq!(state.alltime_dl, 9000);

    assert_eq!(manager.tags_unchecked().await, vec!["linux"]);
}

/// K concurrent `sync` calls while one request is in flight issue exactly
/// one network request, and every caller sees its outcome.
#[tokio::test]
async fn concurrent_syncs_collapse_into_one_request() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;

    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(serde_json::json!({ "rid": 1, "full_update": true })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    // warm the session up front so every sync call is just the one fetch
    client.login().await.expect("login");
    let manager = SyncManager::new(client, SyncOptions::default());

    let (a, b, c, d, e) = tokio::join!(
        manager.sync(),
        manager.sync(),
        manager.sync(),
        manager.sync(),
        manager.sync(),
    );
    for result in [a, b, c, d, e] {
        result.expect("all callers observe the one sync's success");
    }
    assert_eq!(manager.rid().await, 1);

    server.verify().await;
}

#[tokio::test]
async fn sync_failure_is_shared_and_recorded() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let errors_seen = Arc::new(AtomicUsize::new(0));
    let seen = errors_seen.clone();
    let options = SyncOptionsBuilder::default()
        .on_error(Arc::new(move |_error: &qbit_sync::Error| {
            seen.fetch_add(1, Ordering::SeqCst);
        }) as qbit_sync::manager::ErrorCallback)
        .build()
        .unwrap();

    let manager = SyncManager::new(client_for(&server), options);
    let error = manager.sync().await.unwrap_err();
    assert!(matches!(error, qbit_sync::Error::Sync(_)));
    assert!(manager.last_error().await.is_some());
    assert_eq!(errors_seen.load(Ordering::SeqCst), 1);
    assert!(manager.data_unchecked().await.is_none());
}

#[tokio::test]
async fn on_update_receives_snapshots() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/sync/maindata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "rid": 1,
            "full_update": true,
            "torrents": { "abc": { "name": "One" } }
        })))
        .mount(&server)
        .await;

    let updates = Arc::new(AtomicUsize::new(0));
    let counter = updates.clone();
    let options = SyncOptionsBuilder::default()
        .on_update(Arc::new(move |data: &qbit_sync::models::MainData| {
            assert_eq!(data.torrents.len(), 1);
            counter.fetch_add(1, Ordering::SeqCst);
        }) as qbit_sync::manager::UpdateCallback)
        .build()
        .unwrap();

    let manager = SyncManager::new(client_for(&server), options);
    manager.sync().await.unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 1);
}
