//! Session transport behavior against a mock server: login disambiguation,
//! re-login on 403 with request replay, and the retry policy's hard stops.

mod common;

use common::{SID, client_for, mount_login, mount_webapi_version};
use qbit_sync::Error;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn login_captures_session_cookie() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;

    let client = client_for(&server);
    client.login().await.expect("login should succeed");
    assert_eq!(client.sid_cookie().await.as_deref(), Some(SID));
}

#[tokio::test]
async fn login_rejects_fails_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Fails."))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.login().await.unwrap_err();
    assert!(matches!(error, Error::BadCredentials));
}

#[tokio::test]
async fn login_403_means_banned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.login().await.unwrap_err();
    assert!(matches!(error, Error::IpBanned));
}

#[tokio::test]
async fn login_ok_without_cookie_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ok."))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.login().await.unwrap_err();
    assert!(matches!(error, Error::BadCredentials));
}

/// A POST that gets 403, then succeeds after re-login, must send the exact
/// same body bytes on both attempts, with the fresh cookie on the second.
#[tokio::test]
async fn forbidden_triggers_relogin_and_replays_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "SID=first; path=/")
                .set_body_string("Ok."),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "SID=second; path=/")
                .set_body_string("Ok."),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v2/torrents/addTags"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/torrents/addTags"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .add_torrent_tags(&["abc123".to_string()], &["linux".to_string()])
        .await
        .expect("retried request should succeed");

    let requests = server.received_requests().await.expect("recording enabled");
    let attempts: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v2/torrents/addTags")
        .collect();
    assert_eq!(attempts.len(), 2, "one original attempt plus one replay");
    assert!(!attempts[0].body.is_empty());
    assert_eq!(attempts[0].body, attempts[1].body);

    let replay_cookie = attempts[1]
        .headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(replay_cookie, "SID=second");
}

/// Server errors are final: no retry, surfaced as an unexpected status.
#[tokio::test]
async fn server_error_aborts_without_retry() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    Mock::given(method("GET"))
        .and(path("/api/v2/app/defaultSavePath"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client.default_save_path().await.unwrap_err();
    assert!(matches!(
        error,
        Error::UnexpectedStatus { status: 500, .. }
    ));

    let requests = server.received_requests().await.expect("recording enabled");
    let attempts = requests
        .iter()
        .filter(|r| r.url.path() == "/api/v2/app/defaultSavePath")
        .count();
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn version_gates_route_stop_to_pause_on_old_servers() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.9.3").await;
    Mock::given(method("POST"))
        .and(path("/api/v2/torrents/pause"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .stop_torrents(&["abc123".to_string()])
        .await
        .expect("pause should be called on the old endpoint");
}

#[tokio::test]
async fn include_trackers_requires_new_server() {
    let server = MockServer::start().await;
    mount_login(&server, SID).await;
    mount_webapi_version(&server, "2.10.0").await;

    let client = client_for(&server);
    let options = qbit_sync::parameters::TorrentFilterOptionsBuilder::default()
        .include_trackers(true)
        .build()
        .unwrap();
    let error = client.torrents(&options).await.unwrap_err();
    assert!(matches!(error, Error::UnsupportedVersion { .. }));
}
