//! Integration tests for the Azure client using wiremock
//!
//! These tests verify token handling, long-running operation polling,
//! pagination and error mapping against mocked endpoints.

mod common;

use azavset::azure::http::{arm_error, format_azure_error};
use azavset::azure::operation::PollSettings;
use azavset::resource::availability_set;
use common::*;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod token_tests {
    use super::*;

    /// The token is requested once and reused while valid
    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;

        token_request()
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=app"))
            .respond_with(token_response())
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub/resourcegroups/rg"))
            .and(bearer_token(TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "rg"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let url = client.resource_group_url("rg");
        tokio_test::assert_ok!(client.get(&url).await);
        tokio_test::assert_ok!(client.get(&url).await);
    }

    /// Forced refresh bypasses the cache
    #[tokio::test]
    async fn test_refresh_token_requests_again() {
        let server = MockServer::start().await;
        token_mock().expect(2).mount(&server).await;

        let client = client_for(&server, fast_poll());
        assert_eq!(client.credentials.get_token().await.unwrap(), TOKEN);
        assert_eq!(client.credentials.refresh_token().await.unwrap(), TOKEN);
    }

    /// A rejected credential is a fatal error naming the reason
    #[tokio::test]
    async fn test_rejected_credential() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let err = client.authenticate().await.unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Failed to authenticate with Azure"));
        assert!(chain.contains("Credential rejected by identity provider (401): invalid_client"));
        assert!(!chain.contains("AADSTS"));
    }
}

mod operation_tests {
    use super::*;

    fn set_body(name: &str) -> serde_json::Value {
        json!({
            "id": format!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/availabilitySets/{}", name),
            "name": name,
            "location": "eastus",
            "sku": {"name": "Aligned"},
            "properties": {
                "platformFaultDomainCount": 2,
                "platformUpdateDomainCount": 4
            }
        })
    }

    /// 201 + Azure-AsyncOperation is polled to completion, then the resource is re-read
    #[tokio::test]
    async fn test_put_follows_async_operation() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let op_url = format!("{}/operations/op-1", server.uri());
        let set_path = compute_path("availabilitySets/as1");

        Mock::given(method("PUT"))
            .and(path(set_path.clone()))
            .and(query_param("api-version", "2023-09-01"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", op_url.as_str())
                    .set_body_json(json!({"name": "as1", "properties": {"provisioningState": "Creating"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(set_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(set_body("as1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let spec = availability_set::AvailabilitySetSpec::new("eastus").with_domains(2, 4);
        let set = availability_set::create_or_update(&client, "rg", "as1", &spec)
            .await
            .expect("create should succeed");

        assert_eq!(set.fault_domains(), Some(2));
        assert_eq!(set.update_domains(), Some(4));
    }

    /// A failed asynchronous operation surfaces its message
    #[tokio::test]
    async fn test_async_operation_failure() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let op_url = format!("{}/operations/op-2", server.uri());

        Mock::given(method("PUT"))
            .and(path(compute_path("availabilitySets/as1")))
            .respond_with(
                ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", op_url.as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/op-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "error": {"code": "OperationNotAllowed", "message": "Quota exceeded"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let spec = availability_set::AvailabilitySetSpec::new("eastus");
        let err = availability_set::create_or_update(&client, "rg", "as1", &spec)
            .await
            .unwrap_err();

        let chain = format!("{:#}", err);
        assert!(chain.contains("Failed to create availability set 'as1'"));
        assert!(chain.contains("Quota exceeded"));
    }

    /// DELETE answering 202 + Location is polled until the location stops answering 202
    #[tokio::test]
    async fn test_delete_follows_location() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let location = format!("{}/operationresults/del-1", server.uri());

        Mock::given(method("DELETE"))
            .and(path("/subscriptions/sub/resourcegroups/rg"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", location.as_str())
                    .insert_header("Retry-After", "0"),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationresults/del-1"))
            .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationresults/del-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let url = client.resource_group_url("rg");
        tokio_test::assert_ok!(client.delete(&url).await);
    }

    /// Waiting is bounded by the configured operation timeout
    #[tokio::test]
    async fn test_operation_timeout() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let op_url = format!("{}/operations/slow", server.uri());

        Mock::given(method("DELETE"))
            .and(path(compute_path("availabilitySets/as2")))
            .respond_with(
                ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", op_url.as_str()),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operations/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
            .mount(&server)
            .await;

        let poll = PollSettings {
            interval: Duration::from_millis(20),
            timeout: Duration::from_millis(100),
        };
        let client = client_for(&server, poll);
        let err = availability_set::delete(&client, "rg", "as2").await.unwrap_err();
        assert!(format!("{:#}", err).contains("Timed out after"));
    }

    /// An absurd Retry-After ends the wait with a timeout error
    #[tokio::test]
    async fn test_huge_retry_after_times_out() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let location = format!("{}/operationresults/del-2", server.uri());

        Mock::given(method("DELETE"))
            .and(path("/subscriptions/sub/resourcegroups/rg"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", location.as_str())
                    .insert_header("Retry-After", "18446744073709551615"),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationresults/del-2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let url = client.resource_group_url("rg");
        let err = client.delete(&url).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Timed out after"));
    }

    /// A huge configured timeout does not break waiting
    #[tokio::test]
    async fn test_unbounded_timeout_still_polls() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let location = format!("{}/operationresults/del-3", server.uri());

        Mock::given(method("DELETE"))
            .and(path("/subscriptions/sub/resourcegroups/rg"))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/operationresults/del-3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let poll = PollSettings {
            interval: Duration::from_millis(10),
            timeout: Duration::MAX,
        };
        let client = client_for(&server, poll);
        let url = client.resource_group_url("rg");
        tokio_test::assert_ok!(client.delete(&url).await);
    }

    /// 201 with a non-terminal provisioningState polls the resource itself
    #[tokio::test]
    async fn test_put_polls_provisioning_state() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let set_path = compute_path("availabilitySets/as3");

        Mock::given(method("PUT"))
            .and(path(set_path.clone()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "as3",
                "properties": {"provisioningState": "Creating"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(set_path.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "as3",
                "properties": {"provisioningState": "Updating"}
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(set_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "as3",
                "properties": {
                    "provisioningState": "Succeeded",
                    "platformFaultDomainCount": 3,
                    "platformUpdateDomainCount": 5
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let spec = availability_set::AvailabilitySetSpec::new("eastus");
        let set = availability_set::create_or_update(&client, "rg", "as3", &spec)
            .await
            .expect("create should succeed");

        assert_eq!(set.name, "as3");
        assert_eq!(set.fault_domains(), Some(3));
        assert_eq!(set.update_domains(), Some(5));
    }

    /// A resource that ends in Failed reports why
    #[tokio::test]
    async fn test_failed_provisioning_state_reports_reason() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let vm_path = compute_path("virtualMachines/vm1");

        Mock::given(method("PUT"))
            .and(path(vm_path.clone()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "vm1",
                "properties": {"provisioningState": "Creating"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(vm_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "vm1",
                "properties": {
                    "provisioningState": "Failed",
                    "error": {"code": "SkuNotAvailable", "message": "Size not offered in zone 1"}
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let url = client.provider_url(
            "rg",
            "Microsoft.Compute/virtualMachines",
            Some("vm1"),
            "2023-09-01",
        );
        let err = client.put(&url, &json!({"location": "eastus"})).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Operation failed: Size not offered in zone 1"));
    }
}

mod listing_tests {
    use super::*;

    /// nextLink pages are followed until exhausted
    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let next = format!("{}/page-2?api-version=2023-09-01&$skiptoken=abc", server.uri());

        Mock::given(method("GET"))
            .and(path(compute_path("availabilitySets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "as1"}, {"name": "as2"}],
                "nextLink": next
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"name": "as3"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let sets = availability_set::list(&client, "rg").await.unwrap();
        let names: Vec<_> = sets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["as1", "as2", "as3"]);
    }

    /// Subscription-wide listing uses the provider path without a group
    #[tokio::test]
    async fn test_list_by_subscription() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub/providers/Microsoft.Compute/availabilitySets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"name": "x"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let sets = availability_set::list_by_subscription(&client).await.unwrap();
        assert_eq!(sets.len(), 1);
    }

    /// An empty collection is not an error
    #[tokio::test]
    async fn test_list_empty() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path(compute_path("availabilitySets")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        assert!(availability_set::list(&client, "rg").await.unwrap().is_empty());
    }
}

mod error_tests {
    use super::*;

    /// Non-2xx responses keep the status and ARM error code in the chain
    #[tokio::test]
    async fn test_conflict_is_mapped() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("PUT"))
            .and(path(compute_path("availabilitySets/as1")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {"code": "Conflict", "message": "Operation conflicts with another"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let spec = availability_set::AvailabilitySetSpec::new("eastus");
        let err = availability_set::create_or_update(&client, "rg", "as1", &spec)
            .await
            .unwrap_err();

        let arm = arm_error(&err).expect("ARM error in chain");
        assert_eq!(arm.status, 409);
        assert_eq!(arm.code.as_deref(), Some("Conflict"));
        assert_eq!(
            format_azure_error(&err),
            "Resource conflict. The resource may already exist or be in use."
        );
    }

    /// 404 on a single resource read
    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path(compute_path("availabilitySets/missing")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "ResourceNotFound", "message": "not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let err = availability_set::get(&client, "rg", "missing").await.unwrap_err();
        assert_eq!(arm_error(&err).map(|e| e.status), Some(404));
        assert_eq!(format_azure_error(&err), "Resource not found.");
    }

    /// Server errors with non-JSON bodies are still reported
    #[tokio::test]
    async fn test_server_error_with_html_body() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub/resourcegroups/rg"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>unavailable</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, fast_poll());
        let err = client.get(&client.resource_group_url("rg")).await.unwrap_err();
        assert_eq!(
            format_azure_error(&err),
            "Azure service temporarily unavailable. Please try again."
        );
    }
}
