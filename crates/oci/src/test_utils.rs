//! Shared fixtures for registry tests.
//!
//! Every test talks to a `wiremock` server over plain HTTP; the server's
//! `127.0.0.1:<port>` address doubles as the registry host.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{ArtifactRef, ClientConfig, ClientProtocol, RegistryClient};

/// A client that speaks plain HTTP and has no credentials.
pub(crate) fn http_client() -> RegistryClient {
    RegistryClient::new(ClientConfig {
        protocol: ClientProtocol::Http,
        ..Default::default()
    })
    .unwrap()
}

/// A feature reference on the mock registry.
pub(crate) fn feature_ref(server: &MockServer, name: &str) -> ArtifactRef {
    ArtifactRef::parse(&format!("{}/{name}", server.address()))
}

/// Answer every token request with `token`.
pub(crate) async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": token
        })))
        .mount(server)
        .await;
}
