use campus_gate::config::LlmConfig;
use campus_gate::domain::ports::LlmService;
use campus_gate::infra::ai::chat_completion_service::ChatCompletionService;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/openai/deployments/gate-gpt/chat/completions";

fn client_for(server: &MockServer) -> ChatCompletionService {
    ChatCompletionService::new(&LlmConfig {
        endpoint: format!("{}/", server.uri()),
        api_key: "secret-key".into(),
        deployment: "gate-gpt".into(),
        api_version: "2024-08-01-preview".into(),
    })
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "index": 0, "finish_reason": "stop", "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn test_sends_chat_request_and_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(query_param("api-version", "2024-08-01-preview"))
        .and(header("api-key", "secret-key"))
        .and(body_partial_json(json!({
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  hi there  ")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server).generate("hello", "be brief", 0.0).await.unwrap();
    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn test_retries_transient_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"label\":\"EVENT\",\"confidence\":0.8}")))
        .with_priority(2)
        .mount(&server)
        .await;

    let reply = client_for(&server).generate("Seminar", "classify", 0.0).await.unwrap();
    assert_eq!(reply, "{\"label\":\"EVENT\",\"confidence\":0.8}");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).generate("hello", "sys", 0.2).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}
