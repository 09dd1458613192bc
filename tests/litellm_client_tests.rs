use mama::clients::litellm::{LiteLlmClient, LiteLlmError};
use mama::config::LiteLlmConfig;
use reqwest::StatusCode;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> LiteLlmClient {
    LiteLlmClient::new(&LiteLlmConfig {
        url: server.uri(),
        master_key: "sk-master".to_string(),
        retry_delay_ms: 10,
        ..LiteLlmConfig::default()
    })
    .unwrap()
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_list_models_uses_master_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("authorization", "Bearer sk-master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "gpt-4o", "object": "model", "created": 1_700_000_000, "owned_by": "openai"},
                {"id": "claude-3"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listed = client_for(&server).list_models().await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], "gpt-4o");
    assert_eq!(listed[0]["owned_by"], "openai");
    assert_eq!(listed[1]["id"], "claude-3");
    assert!(listed[1].get("owned_by").is_none());
}

#[tokio::test]
async fn test_list_models_passes_entries_through() {
    let server = MockServer::start().await;
    let entries = json!([
        {"id": "gpt-4o", "permission": [{"allow_sampling": true}], "root": "gpt-4o"},
        {"model_name": "claude-3", "litellm_params": {"model": "anthropic/claude-3"}}
    ]);
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": entries})))
        .mount(&server)
        .await;

    let listed = client_for(&server).list_models().await.unwrap();

    assert_eq!(serde_json::Value::Array(listed), entries);
}

#[tokio::test]
async fn test_list_models_without_data_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list"})))
        .mount(&server)
        .await;

    assert!(client_for(&server).list_models().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_key_sends_models_and_alias() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/generate"))
        .and(body_json(json!({
            "models": ["gpt-4o"],
            "user_id": "alice",
            "key_alias": "alice"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "sk-alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let key = client_for(&server)
        .generate_key(&models(&["gpt-4o"]), Some("alice"), None, Some("alice"))
        .await
        .unwrap();

    assert_eq!(key, "sk-alice");
}

#[tokio::test]
async fn test_generate_key_falls_back_to_token_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "sk-token"})))
        .mount(&server)
        .await;

    let key = client_for(&server)
        .generate_key(&[], None, Some(&json!({"team": "ml"})), None)
        .await
        .unwrap();

    assert_eq!(key, "sk-token");
}

#[tokio::test]
async fn test_generate_key_without_key_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expires": null})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generate_key(&[], Some("alice"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, LiteLlmError::MissingKey));
}

#[tokio::test]
async fn test_non_200_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/generate"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": "sk-alice"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/key/delete"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let err = client
        .generate_key(&[], Some("alice"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LiteLlmError::Status { status, .. } if status == StatusCode::CREATED
    ));

    match client.delete_key("sk-alice").await.unwrap_err() {
        LiteLlmError::Status { status, body, .. } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = LiteLlmClient::new(&LiteLlmConfig {
        url: server.uri(),
        max_retries: 3,
        retry_delay_ms: 10,
        ..LiteLlmConfig::default()
    })
    .unwrap();

    let err = client.list_models().await.unwrap_err();
    assert!(matches!(
        err,
        LiteLlmError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
}

#[tokio::test]
async fn test_delete_key_sends_key_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/delete"))
        .and(body_json(json!({"keys": ["sk-alice"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted_keys": ["sk-alice"]})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_key("sk-alice").await.unwrap();
}

#[tokio::test]
async fn test_key_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/key/update"))
        .and(body_partial_json(json!({"key": "sk-alice", "models": ["claude-3"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/key/update"))
        .and(body_partial_json(json!({"key": "sk-alice", "key_alias": "alice-prod"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .update_key_models("sk-alice", &models(&["claude-3"]))
        .await
        .unwrap();
    client
        .update_key_alias("sk-alice", "alice-prod")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_key_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/key/info"))
        .and(query_param("key", "sk-alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "sk-alice",
            "info": {"models": ["gpt-4o", "claude-3"], "spend": 0.0}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/key/info"))
        .and(query_param("key", "sk-open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "sk-open", "info": {}})))
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(
        client.get_key_models("sk-alice").await.unwrap(),
        Some(models(&["gpt-4o", "claude-3"]))
    );
    assert_eq!(client.get_key_models("sk-open").await.unwrap(), None);
}

fn unreachable_client(max_retries: u32, retry_delay_ms: u64) -> LiteLlmClient {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    LiteLlmClient::new(&LiteLlmConfig {
        url: format!("http://127.0.0.1:{port}"),
        max_retries,
        retry_delay_ms,
        ..LiteLlmConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_unreachable_proxy_fails_after_retries() {
    let err = unreachable_client(2, 10).list_models().await.unwrap_err();
    assert!(matches!(err, LiteLlmError::Request(_)));
}

#[tokio::test]
async fn test_retries_wait_between_attempts() {
    let start = Instant::now();
    let err = unreachable_client(0, 100).list_models().await.unwrap_err();
    let without_retries = start.elapsed();
    assert!(matches!(err, LiteLlmError::Request(_)));
    assert!(without_retries < Duration::from_millis(300), "{without_retries:?}");

    let start = Instant::now();
    let err = unreachable_client(3, 100).list_models().await.unwrap_err();
    let with_retries = start.elapsed();
    assert!(matches!(err, LiteLlmError::Request(_)));
    assert!(with_retries >= Duration::from_millis(300), "{with_retries:?}");
}

#[test]
fn test_invalid_url_is_rejected() {
    let err = LiteLlmClient::new(&LiteLlmConfig {
        url: "not a url".to_string(),
        ..LiteLlmConfig::default()
    })
    .unwrap_err();

    assert!(matches!(err, LiteLlmError::InvalidUrl { .. }));
}
