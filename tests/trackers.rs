//! Tracker manager behavior: per-hash fallback with deduplication, the
//! `includeTrackers` bulk path, and the TTL cache.

mod common;

use common::{SID, client_for, mount_login, mount_webapi_version};
use qbit_sync::manager::TrackerManager;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tracker_json(url: &str) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "status": 2,
        "tier": 0,
        "num_peers": 10,
        "num_seeds": 5,
        "num_leeches": 5,
        "num_downloaded": 42,
        "msg": ""
    })
}

/// Old server, duplicated input: the per-hash endpoint is hit exactly once
/// per unique hash.
#[tokio::test]
async fn per_hash_fallback_deduplicates() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.10.0").await;

    for hash in ["aaa", "bbb"] {
        Mock::given(method("GET"))
            .and(path("/api/v2/torrents/trackers"))
            .and(query_param("hash", hash))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([tracker_json("udp://t.example/announce")])),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let manager = TrackerManager::new(client_for(&server));
    let hashes = vec![
        "aaa".to_string(),
        "bbb".to_string(),
        "aaa".to_string(),
        "aaa".to_string(),
    ];
    let (found, error) = manager.trackers(&hashes).await;

    assert!(error.is_none());
    assert_eq!(found.len(), 2);
    assert_eq!(found["aaa"].len(), 1);
    server.verify().await;
}

/// New server: one bulk `torrents/info` call with `includeTrackers`, no
/// per-hash requests.
#[tokio::test]
async fn bulk_path_uses_include_trackers() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.11.4").await;

    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .and(query_param("includeTrackers", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "hash": "aaa",
                "name": "A",
                "trackers": [tracker_json("udp://t1.example/announce")]
            },
            {
                "hash": "bbb",
                "name": "B",
                "trackers": [tracker_json("udp://t2.example/announce")]
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/trackers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let manager = TrackerManager::new(client_for(&server));
    let (found, error) = manager
        .trackers(&["aaa".to_string(), "bbb".to_string()])
        .await;

    assert!(error.is_none());
    assert_eq!(found["aaa"][0].url, "udp://t1.example/announce");
    assert_eq!(found["bbb"][0].url, "udp://t2.example/announce");
    server.verify().await;
}

/// A second lookup inside the TTL is served from the cache.
#[tokio::test]
async fn cache_prevents_refetch() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.10.0").await;

    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/trackers"))
        .and(query_param("hash", "aaa"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([tracker_json("udp://t.example/announce")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TrackerManager::new(client_for(&server));
    let hashes = vec!["aaa".to_string()];

    let (first, _) = manager.trackers(&hashes).await;
    let (second, _) = manager.trackers(&hashes).await;

    assert_eq!(first["aaa"].len(), 1);
    assert_eq!(second["aaa"].len(), 1);
    server.verify().await;
}

/// A failing hash does not stop the rest; partial results come back with
/// the first error.
#[tokio::test]
async fn partial_results_with_first_error() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.10.0").await;

    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/trackers"))
        .and(query_param("hash", "good"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([tracker_json("udp://t.example/announce")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/trackers"))
        .and(query_param("hash", "gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let manager = TrackerManager::new(client_for(&server));
    let (found, error) = manager
        .trackers(&["good".to_string(), "gone".to_string()])
        .await;

    assert_eq!(found.len(), 1);
    assert!(found.contains_key("good"));
    assert!(matches!(
        error,
        Some(qbit_sync::Error::TorrentNotFound { .. })
    ));
}

/// `populate` only touches torrents that lack an embedded tracker list.
#[tokio::test]
async fn populate_fills_missing_tracker_lists() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.10.0").await;

    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/trackers"))
        .and(query_param("hash", "bare"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([tracker_json("udp://t.example/announce")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut torrents = vec![
        qbit_sync::models::Torrent {
            hash: "bare".to_string(),
            reannounce: 120,
            ..Default::default()
        },
        qbit_sync::models::Torrent {
            hash: "full".to_string(),
            trackers: Some(Vec::new()),
            ..Default::default()
        },
    ];

    let manager = TrackerManager::new(client_for(&server));
    let error = manager.populate(&mut torrents).await;

    assert!(error.is_none());
    assert!(torrents[0].trackers.is_some());
    assert_eq!(torrents[0].trackers.as_ref().unwrap().len(), 1);
    // the pre-filled torrent was left alone, no request for it
    server.verify().await;
}
