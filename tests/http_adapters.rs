//! HTTP adapters against a local stub of the hosted services.

mod common;

use grounded_chat::completion::{Completer, OpenAiCompleter};
use grounded_chat::config::{OpenAiConfig, Provider, SearchConfig};
use grounded_chat::embedding::{Embedder, OpenAiEmbedder};
use grounded_chat::error::RagError;
use grounded_chat::index::azure::AzureSearchIndex;
use grounded_chat::index::{HybridQuery, SearchIndex};
use grounded_chat::models::{ConversationTurn, IndexRecord};
use serde_json::json;

fn openai_config(base_url: &str, provider: Provider) -> OpenAiConfig {
    OpenAiConfig {
        provider,
        endpoint: Some(match provider {
            Provider::Azure => base_url.to_string(),
            Provider::OpenAi => format!("{}/v1", base_url),
        }),
        api_key: Some(common::API_KEY.to_string()),
        api_key_env: "AOAI_API_KEY".to_string(),
        api_version: "2024-02-01".to_string(),
        embedding_deployment: common::EMBED_DEPLOYMENT.to_string(),
        chat_deployment: common::CHAT_DEPLOYMENT.to_string(),
        timeout_secs: 10,
        max_retries: 0,
    }
}

fn search_config(base_url: &str) -> SearchConfig {
    SearchConfig {
        endpoint: base_url.to_string(),
        index_name: common::INDEX_NAME.to_string(),
        api_key: Some(common::API_KEY.to_string()),
        api_key_env: "SEARCH_SERVICE_API_KEY".to_string(),
        api_version: "2023-11-01".to_string(),
        id_field: "id".to_string(),
        content_field: "content".to_string(),
        vector_field: "contentVector".to_string(),
        top_k: 5,
        semantic_configuration: None,
        timeout_secs: 10,
        max_retries: 0,
    }
}

#[tokio::test]
async fn test_azure_embedding() {
    let stub = common::start().await;
    let embedder = OpenAiEmbedder::new(&openai_config(&stub.base_url, Provider::Azure)).unwrap();

    let vector = embedder.embed("有給").await.unwrap();
    assert_eq!(vector, common::fake_vector("有給"));

    let requests = stub.state.requests("embeddings");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key.as_deref(), Some(common::API_KEY));
    assert_eq!(requests[0].body, json!({"input": "有給"}));
}

#[tokio::test]
async fn test_openai_provider_uses_bearer_and_model() {
    let stub = common::start().await;
    let embedder = OpenAiEmbedder::new(&openai_config(&stub.base_url, Provider::OpenAi)).unwrap();

    embedder.embed("hello").await.unwrap();

    let requests = stub.state.requests("embeddings");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some(format!("Bearer {}", common::API_KEY).as_str())
    );
    assert!(requests[0].api_key.is_none());
    assert_eq!(requests[0].body["model"], common::EMBED_DEPLOYMENT);
}

#[tokio::test]
async fn test_chat_completion() {
    let stub = common::start().await;
    let completer =
        OpenAiCompleter::new(&openai_config(&stub.base_url, Provider::Azure)).unwrap();

    let messages = vec![
        ConversationTurn::system("policy"),
        ConversationTurn::user("question"),
    ];
    let reply = completer.complete(&messages).await.unwrap();
    assert_eq!(reply, common::REPLY);

    let requests = stub.state.requests("chat");
    assert_eq!(
        requests[0].body,
        json!({"messages": [
            {"role": "system", "content": "policy"},
            {"role": "user", "content": "question"}
        ]})
    );
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let stub = common::start().await;
    stub.state.fail_with(400);
    let mut config = openai_config(&stub.base_url, Provider::Azure);
    config.max_retries = 3;
    let embedder = OpenAiEmbedder::new(&config).unwrap();

    let err = embedder.embed("x").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
    assert!(err.to_string().contains("400"));
    assert_eq!(stub.state.requests("embeddings").len(), 1);
}

#[tokio::test]
async fn test_server_error_single_attempt_by_default() {
    let stub = common::start().await;
    stub.state.fail_with(500);
    let completer =
        OpenAiCompleter::new(&openai_config(&stub.base_url, Provider::Azure)).unwrap();

    let err = completer
        .complete(&[ConversationTurn::user("q")])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Completion(_)));
    assert_eq!(stub.state.requests("chat").len(), 1);
}

#[tokio::test]
async fn test_server_error_retried_when_configured() {
    let stub = common::start().await;
    stub.state.fail_with(503);
    let mut config = openai_config(&stub.base_url, Provider::Azure);
    config.max_retries = 1;
    let embedder = OpenAiEmbedder::new(&config).unwrap();

    assert!(embedder.embed("x").await.is_err());
    assert_eq!(stub.state.requests("embeddings").len(), 2);
}

#[tokio::test]
async fn test_unreachable_service_is_embedding_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let embedder = OpenAiEmbedder::new(&openai_config(&base_url, Provider::Azure)).unwrap();

    let err = embedder.embed("x").await.unwrap_err();
    assert!(matches!(err, RagError::Embedding(_)));
}

#[tokio::test]
async fn test_search_upsert_then_query() {
    let stub = common::start().await;
    let index = AzureSearchIndex::new(&search_config(&stub.base_url)).unwrap();

    for (id, text) in [("0", "有給は年10日です"), ("1", "申請は前日までに行ってください")] {
        index
            .upsert(&IndexRecord {
                id: id.to_string(),
                text: text.to_string(),
                vector: vec![0.5, 0.5],
            })
            .await
            .unwrap();
    }

    let upserts = stub.state.requests("docs/index");
    assert_eq!(upserts.len(), 2);
    assert_eq!(upserts[0].api_key.as_deref(), Some(common::API_KEY));
    assert_eq!(upserts[0].body["value"][0]["@search.action"], "mergeOrUpload");
    assert_eq!(upserts[1].body["value"][0]["id"], "1");
    assert_eq!(
        upserts[1].body["value"][0]["contentVector"],
        json!([0.5, 0.5])
    );

    let query = HybridQuery {
        text: "有給".to_string(),
        vector: vec![1.0, 0.0],
        top_k: 5,
        fields: vec!["id".to_string(), "content".to_string()],
    };
    let sources = index.query(&query).await.unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, "0");
    assert_eq!(sources[0].text, "有給は年10日です");
    assert_eq!(sources[1].id, "1");

    let searches = stub.state.requests("docs/search");
    assert_eq!(searches[0].body["search"], "有給");
    assert_eq!(searches[0].body["select"], "id,content");
    assert_eq!(searches[0].body["vectorQueries"][0]["fields"], "contentVector");
}

#[tokio::test]
async fn test_search_failure_is_index_error() {
    let stub = common::start().await;
    stub.state.fail_with(403);
    let index = AzureSearchIndex::new(&search_config(&stub.base_url)).unwrap();

    let err = index
        .upsert(&IndexRecord {
            id: "0".to_string(),
            text: "t".to_string(),
            vector: vec![1.0],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Index(_)));
}

#[tokio::test]
async fn test_create_index_schema() {
    let stub = common::start().await;
    let index = AzureSearchIndex::new(&search_config(&stub.base_url)).unwrap();

    index.create_or_update_index(2).await.unwrap();

    let requests = stub.state.requests("index");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body["name"], common::INDEX_NAME);
    assert_eq!(requests[0].body["fields"][2]["dimensions"], 2);
}
