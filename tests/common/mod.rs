//! Shared fixtures: a client pointed at a wiremock server standing in for
//! both the identity provider and Resource Manager.

#![allow(dead_code)]

use azavset::azure::auth::Credentials;
use azavset::azure::client::{AzureClient, Endpoints};
use azavset::azure::operation::PollSettings;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

pub const TENANT: &str = "tenant";
pub const SUBSCRIPTION: &str = "sub";
pub const TOKEN: &str = "test-token";

pub fn credentials() -> Credentials {
    Credentials {
        client_id: "app".into(),
        client_secret: "secret".into(),
        tenant_id: TENANT.into(),
        subscription_id: SUBSCRIPTION.into(),
    }
}

pub fn fast_poll() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    }
}

pub fn client_for(server: &MockServer, poll: PollSettings) -> AzureClient {
    let endpoints = Endpoints {
        authority_host: server.uri(),
        resource_manager: server.uri(),
    };
    AzureClient::new(credentials(), &endpoints, poll).expect("client should build")
}

pub fn token_request() -> MockBuilder {
    Mock::given(method("POST")).and(path(format!("/{}/oauth2/v2.0/token", TENANT)))
}

pub fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "token_type": "Bearer",
        "expires_in": 3599,
        "access_token": TOKEN
    }))
}

pub fn token_mock() -> Mock {
    token_request().respond_with(token_response())
}

pub async fn mount_token(server: &MockServer) {
    token_mock().mount(server).await;
}

pub fn compute_path(resource: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/rg/providers/Microsoft.Compute/{}",
        SUBSCRIPTION, resource
    )
}
