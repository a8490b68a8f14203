//! Azure AI Search backend.
//!
//! Talks to the search service's REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upsert | `POST /indexes/{index}/docs/index` with one `mergeOrUpload` action |
//! | query | `POST /indexes/{index}/docs/search` with `search`, `vectorQueries`, `select`, `top` |
//! | schema | `PUT /indexes/{index}` with an HNSW vector profile |
//!
//! When `semantic_configuration` is set the query also asks for semantic
//! re-ranking. Result order is the service's order.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::SearchConfig;
use crate::error::{RagError, Result};
use crate::http;
use crate::models::{IndexRecord, RetrievedSource};

use super::{HybridQuery, SearchIndex};

const VECTOR_PROFILE: &str = "vector-profile";
const VECTOR_ALGORITHM: &str = "hnsw-config";

#[derive(Clone)]
pub struct AzureSearchIndex {
    http: reqwest::Client,
    base_url: String,
    index_name: String,
    api_key: String,
    api_version: String,
    id_field: String,
    content_field: String,
    vector_field: String,
    semantic_configuration: Option<String>,
    max_retries: u32,
}

impl std::fmt::Debug for AzureSearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSearchIndex")
            .field("base_url", &self.base_url)
            .field("index_name", &self.index_name)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AzureSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| RagError::Configuration("search.api_key not resolved".to_string()))?;
        Ok(Self {
            http: http::client(config.timeout_secs)?,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            api_key,
            api_version: config.api_version.clone(),
            id_field: config.id_field.clone(),
            content_field: config.content_field.clone(),
            vector_field: config.vector_field.clone(),
            semantic_configuration: config.semantic_configuration.clone(),
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/indexes/{}{}?api-version={}",
            self.base_url, self.index_name, path, self.api_version
        )
    }

    /// Body of a single-record `docs/index` request.
    pub fn upsert_body(&self, record: &IndexRecord) -> Value {
        let mut doc = serde_json::Map::new();
        doc.insert("@search.action".into(), json!("mergeOrUpload"));
        doc.insert(self.id_field.clone(), json!(record.id));
        doc.insert(self.content_field.clone(), json!(record.text));
        doc.insert(self.vector_field.clone(), json!(record.vector));
        json!({ "value": [Value::Object(doc)] })
    }

    /// Body of a hybrid `docs/search` request.
    pub fn query_body(&self, query: &HybridQuery) -> Value {
        let select = if query.fields.is_empty() {
            format!("{},{}", self.id_field, self.content_field)
        } else {
            query.fields.join(",")
        };
        let mut body = json!({
            "search": query.text,
            "vectorQueries": [{
                "kind": "vector",
                "vector": query.vector,
                "fields": self.vector_field,
                "k": query.top_k,
            }],
            "select": select,
            "top": query.top_k,
        });
        if let (Some(name), Some(obj)) = (&self.semantic_configuration, body.as_object_mut()) {
            obj.insert("queryType".into(), json!("semantic"));
            obj.insert("semanticConfiguration".into(), json!(name));
        }
        body
    }

    /// Index definition with the configured fields and a `dims`-wide vector.
    pub fn schema(&self, dims: usize) -> Value {
        let mut schema = json!({
            "name": self.index_name,
            "fields": [
                {"name": self.id_field, "type": "Edm.String", "key": true, "filterable": true},
                {"name": self.content_field, "type": "Edm.String", "searchable": true},
                {
                    "name": self.vector_field,
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": dims,
                    "vectorSearchProfile": VECTOR_PROFILE,
                },
            ],
            "vectorSearch": {
                "algorithms": [{"name": VECTOR_ALGORITHM, "kind": "hnsw"}],
                "profiles": [{"name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM}],
            },
        });
        if let (Some(name), Some(obj)) = (&self.semantic_configuration, schema.as_object_mut()) {
            obj.insert(
                "semantic".into(),
                json!({
                    "configurations": [{
                        "name": name,
                        "prioritizedFields": {
                            "prioritizedContentFields": [{"fieldName": self.content_field}]
                        }
                    }]
                }),
            );
        }
        schema
    }

    /// Create the index, or update it in place if it already exists.
    pub async fn create_or_update_index(&self, dims: usize) -> Result<()> {
        if dims == 0 {
            return Err(RagError::Configuration(
                "vector dimensions must be > 0".to_string(),
            ));
        }
        let url = self.url("");
        log::info!("creating or updating index {} ({} dims)", self.index_name, dims);
        let request = self
            .http
            .put(&url)
            .header("api-key", &self.api_key)
            .json(&self.schema(dims));
        http::send_json(request, self.max_retries, "create index", RagError::Index).await?;
        Ok(())
    }

    /// Turn a `docs/search` response into sources, keeping service order.
    ///
    /// `fields` is the projection the query asked for: record id first,
    /// record text second. Missing entries fall back to the configured
    /// field names.
    pub fn parse_results(&self, json: &Value, fields: &[String]) -> Result<Vec<RetrievedSource>> {
        let id_field = fields.first().unwrap_or(&self.id_field);
        let content_field = fields.get(1).unwrap_or(&self.content_field);
        let hits = json
            .get("value")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RagError::Index("invalid search response: missing value".into()))?;

        hits.iter()
            .map(|hit| {
                let id = match hit.get(id_field) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => {
                        return Err(RagError::Index(format!(
                            "search hit missing field '{}'",
                            id_field
                        )))
                    }
                };
                let text = hit
                    .get(content_field)
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| {
                        RagError::Index(format!(
                            "search hit {} missing field '{}'",
                            id, content_field
                        ))
                    })?
                    .to_string();
                let score = hit
                    .get("@search.rerankerScore")
                    .or_else(|| hit.get("@search.score"))
                    .and_then(|s| s.as_f64());
                Ok(RetrievedSource { id, text, score })
            })
            .collect()
    }
}

/// Reject a `docs/index` response that reports a per-document failure.
fn check_indexing_result(json: &Value) -> Result<()> {
    let failed = json
        .get("value")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .find(|r| r.get("status").and_then(|s| s.as_bool()) == Some(false));
    match failed {
        Some(r) => Err(RagError::Index(format!(
            "record {} rejected: {}",
            r.get("key").and_then(|k| k.as_str()).unwrap_or("?"),
            r.get("errorMessage")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl SearchIndex for AzureSearchIndex {
    async fn upsert(&self, record: &IndexRecord) -> Result<()> {
        let url = self.url("/docs/index");
        log::debug!("upserting record id={} ({} dims)", record.id, record.vector.len());
        let request = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&self.upsert_body(record));
        let response = http::send_json(request, self.max_retries, "upsert", RagError::Index).await?;
        check_indexing_result(&response)
    }

    async fn query(&self, query: &HybridQuery) -> Result<Vec<RetrievedSource>> {
        let url = self.url("/docs/search");
        log::debug!("hybrid query top={} on {}", query.top_k, self.index_name);
        let request = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&self.query_body(query));
        let response = http::send_json(request, self.max_retries, "query", RagError::Index).await?;
        self.parse_results(&response, &query.fields)
    }
}
