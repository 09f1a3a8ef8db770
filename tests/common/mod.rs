//! Shared helpers for the mock-server integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use qbit_sync::{Api, ClientConfigBuilder};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SID: &str = "mocksession";

/// A client pointed at the mock server with the default test credentials.
pub fn client_for(server: &MockServer) -> Arc<Api> {
    let config = ClientConfigBuilder::default()
        .host(server.uri())
        .username("admin")
        .password("adminadmin")
        .max_retries(3u32)
        .build()
        .expect("valid test config");
    Arc::new(Api::new(config).expect("client construction"))
}

/// Mount a login endpoint answering `Ok.` with a session cookie.
pub async fn mount_login(server: &MockServer, sid: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v2/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("SID={sid}; HttpOnly; path=/").as_str())
                .set_body_string("Ok."),
        )
        .mount(server)
        .await;
}

/// Mount `app/webapiVersion` reporting the given version.
pub async fn mount_webapi_version(server: &MockServer, version: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v2/app/webapiVersion"))
        .respond_with(ResponseTemplate::new(200).set_body_string(version))
        .mount(server)
        .await;
}
