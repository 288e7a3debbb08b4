//! Elasticsearchクライアントの通信テスト
//!
//! ローカルのダミーサーバで必要なREST APIだけを再現

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use beauty_recycle::store::{ElasticIndex, ResultStore, SearchIndex, StoreError, INDEX_NAME};
use beauty_recycle_common::{ClassificationComponent, DisposalCategory};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const API_KEY: &str = "test-api-key";

#[derive(Default)]
struct FakeCluster {
    indices: HashMap<String, Value>,
    documents: Vec<Value>,
    refresh_params: Vec<Option<String>>,
    last_search: Option<Value>,
}

type Shared = Arc<Mutex<FakeCluster>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("ApiKey {}", API_KEY))
}

fn forbidden() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": {"type": "security_exception"}, "status": 403})),
    )
        .into_response()
}

async fn root(headers: HeaderMap) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    Json(json!({"cluster_name": "fake", "version": {"number": "8.13.0"}})).into_response()
}

async fn head_index(State(state): State<Shared>, Path(index): Path<String>) -> StatusCode {
    if state.lock().unwrap().indices.contains_key(&index) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn put_index(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(index): Path<String>,
    Json(schema): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    let mut cluster = state.lock().unwrap();
    if cluster.indices.contains_key(&index) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"type": "resource_already_exists_exception"}, "status": 400})),
        )
            .into_response();
    }
    cluster.indices.insert(index.clone(), schema);
    Json(json!({"acknowledged": true, "index": index})).into_response()
}

async fn post_doc(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(index): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(document): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    let mut cluster = state.lock().unwrap();
    if !cluster.indices.contains_key(&index) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"type": "index_not_found_exception"}, "status": 404})),
        )
            .into_response();
    }
    cluster.refresh_params.push(params.get("refresh").cloned());
    cluster.documents.push(document);
    let id = format!("doc-{}", cluster.documents.len());
    (StatusCode::CREATED, Json(json!({"_id": id, "result": "created"}))).into_response()
}

async fn search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(query): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return forbidden();
    }
    let mut cluster = state.lock().unwrap();
    cluster.last_search = Some(query);

    // created_at 降順の先頭（RFC 3339 は文字列比較で順序が保たれる）
    let latest = cluster
        .documents
        .iter()
        .max_by_key(|doc| doc["created_at"].as_str().unwrap_or_default().to_string())
        .cloned();

    let hits: Vec<Value> = latest.into_iter().map(|doc| json!({"_id": "x", "_source": doc})).collect();
    Json(json!({"hits": {"total": {"value": hits.len()}, "hits": hits}})).into_response()
}

async fn spawn_cluster() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(FakeCluster::default()));
    let router = Router::new()
        .route("/", get(root))
        .route("/:index", axum::routing::head(head_index).put(put_index))
        .route("/:index/_doc", post(post_doc))
        .route("/:index/_search", post(search))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn components() -> Vec<ClassificationComponent> {
    vec![ClassificationComponent {
        component_name: "Compact".into(),
        material: "Mixed plastic".into(),
        disposal_category: DisposalCategory::Pact,
        classification_explanation: "Mirror compact".into(),
    }]
}

#[tokio::test]
async fn test_store_round_trip_over_http() {
    let (url, state) = spawn_cluster().await;
    let index = ElasticIndex::new(&url, API_KEY, false).unwrap();
    let store = ResultStore::connect_with(Arc::new(index)).await;
    assert!(store.is_available());

    store.ensure_index().await.unwrap();
    store.ensure_index().await.unwrap();

    let id = store.save("Pressed powder compact", &components()).await;
    assert_eq!(id.as_deref(), Some("doc-1"));

    let latest = store.get_latest().await.unwrap();
    assert_eq!(latest.product_description, "Pressed powder compact");
    assert_eq!(latest.components().unwrap(), components());

    let cluster = state.lock().unwrap();
    let schema = &cluster.indices[INDEX_NAME];
    assert_eq!(schema["mappings"]["properties"]["created_at"]["type"], "date");
    assert_eq!(schema["mappings"]["properties"]["classification_result"]["index"], false);
    assert_eq!(cluster.refresh_params, vec![Some("wait_for".to_string())]);

    let query = cluster.last_search.as_ref().unwrap();
    assert_eq!(query["size"], 1);
    assert_eq!(query["sort"][0]["created_at"]["order"], "desc");
}

#[tokio::test]
async fn test_create_existing_index_is_reported() {
    let (url, _state) = spawn_cluster().await;
    let index = ElasticIndex::new(&url, API_KEY, false).unwrap();

    assert!(!index.index_exists(INDEX_NAME).await.unwrap());
    index.create_index(INDEX_NAME, &json!({})).await.unwrap();
    assert!(index.index_exists(INDEX_NAME).await.unwrap());

    let second = index.create_index(INDEX_NAME, &json!({})).await;
    assert_eq!(second, Err(StoreError::IndexAlreadyExists(INDEX_NAME.to_string())));
}

#[tokio::test]
async fn test_wrong_api_key_disables_store() {
    let (url, _state) = spawn_cluster().await;
    let index = ElasticIndex::new(&url, "wrong-key", false).unwrap();

    assert!(matches!(index.ping().await, Err(StoreError::Unauthorized(_))));

    let store = ResultStore::connect_with(Arc::new(index)).await;
    assert!(!store.is_available());
}

#[tokio::test]
async fn test_search_without_index() {
    let (url, _state) = spawn_cluster().await;
    let index = ElasticIndex::new(&url, API_KEY, false).unwrap();

    let result = index.search_latest(INDEX_NAME, "created_at").await;
    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn test_unreachable_cluster() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let index = ElasticIndex::new(&format!("http://{}", addr), API_KEY, false)
        .unwrap()
        .with_max_retries(1);

    assert!(matches!(index.ping().await, Err(StoreError::Unavailable(_))));
}
