//! Data Transfer and Groups Settings adapters against a mock server.

use converge_core::{ApplicationTransfer, SettingsOps, TransferOps, TransferStatus};
use converge_gsuite::{BearerToken, DataTransferApi, GoogleClient, GroupsSettingsApi};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> GoogleClient {
    let token = BearerToken::new(SecretString::from("test-token".to_string()));
    GoogleClient::with_http_client(token, reqwest::Client::new())
}

#[tokio::test]
async fn test_applications_are_listed_with_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datatransfer/v1/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "applications": [
                {
                    "id": "55656082996",
                    "name": "Drive and Docs",
                    "transferParams": [{"key": "PRIVACY_LEVEL", "value": ["PRIVATE", "SHARED"]}],
                },
                {"id": "435070579839", "name": "Calendar"},
            ],
        })))
        .mount(&server)
        .await;

    let api = DataTransferApi::new(client(), &format!("{}/datatransfer/v1", server.uri()));
    let categories = api.list_transferable_categories().await.unwrap();

    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].id, "55656082996");
    assert_eq!(categories[0].name, "Drive and Docs");
    assert_eq!(categories[0].transfer_params.len(), 1);
    assert!(categories[1].transfer_params.is_empty());
}

#[tokio::test]
async fn test_transfer_job_is_created_and_polled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/datatransfer/v1/transfers"))
        .and(body_json(json!({
            "oldOwnerUserId": "1001",
            "newOwnerUserId": "1002",
            "applicationDataTransfers": [
                {
                    "applicationId": "55656082996",
                    "applicationTransferParams": [{"key": "PRIVACY_LEVEL", "value": ["PRIVATE"]}],
                },
                {"applicationId": "435070579839"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "AKrEtIb",
            "overallTransferStatusCode": "inProgress",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/datatransfer/v1/transfers/AKrEtIb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "AKrEtIb",
            "overallTransferStatusCode": "completed",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = DataTransferApi::new(client(), &format!("{}/datatransfer/v1", server.uri()));
    let job = api
        .create_transfer_job(
            "1001",
            "1002",
            &[
                ApplicationTransfer {
                    application_id: "55656082996".into(),
                    params: Some(json!({"key": "PRIVACY_LEVEL", "value": ["PRIVATE"]})),
                },
                ApplicationTransfer {
                    application_id: "435070579839".into(),
                    params: None,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(job.id, "AKrEtIb");
    assert_eq!(job.status, TransferStatus::InProgress);

    let polled = api.get_transfer_job("AKrEtIb").await.unwrap();
    assert_eq!(polled.status, TransferStatus::Completed);
}

#[tokio::test]
async fn test_find_transfer_job_between_users() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datatransfer/v1/transfers"))
        .and(query_param("oldOwnerUserId", "1001"))
        .and(query_param("newOwnerUserId", "1002"))
        .and(query_param("status", "inProgress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataTransfers": [
                {"id": "running", "overallTransferStatusCode": "inProgress"},
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/datatransfer/v1/transfers"))
        .and(query_param("oldOwnerUserId", "2001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "admin#datatransfer#dataTransfersList"})))
        .mount(&server)
        .await;

    let api = DataTransferApi::new(client(), &format!("{}/datatransfer/v1", server.uri()));
    let job = api.find_transfer_job("1001", "1002").await.unwrap().unwrap();
    assert_eq!(job.id, "running");
    assert_eq!(job.status, TransferStatus::InProgress);

    assert!(api.find_transfer_job("2001", "1002").await.unwrap().is_none());
}

#[tokio::test]
async fn test_find_transfer_job_skips_finished_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/datatransfer/v1/transfers"))
        .and(query_param("oldOwnerUserId", "1001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dataTransfers": [
                {"id": "old", "overallTransferStatusCode": "completed"},
                {"id": "broken", "overallTransferStatusCode": "failed"},
            ],
        })))
        .mount(&server)
        .await;

    let api = DataTransferApi::new(client(), &format!("{}/datatransfer/v1", server.uri()));
    assert!(api.find_transfer_job("1001", "1002").await.unwrap().is_none());
}

#[tokio::test]
async fn test_groups_settings_patch() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/groups/v1/groups/team%40example.com"))
        .and(query_param("alt", "json"))
        .and(body_json(json!({"whoCanPostMessage": "ALL_MEMBERS_CAN_POST"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "team@example.com",
            "whoCanPostMessage": "ALL_MEMBERS_CAN_POST",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = GroupsSettingsApi::new(client(), &format!("{}/groups/v1/groups/", server.uri()));
    let mut settings = serde_json::Map::new();
    settings.insert("whoCanPostMessage".into(), json!("ALL_MEMBERS_CAN_POST"));
    api.patch_settings("team@example.com", &settings).await.unwrap();
}
