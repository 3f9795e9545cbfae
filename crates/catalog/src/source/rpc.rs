//! JSON-RPC catalog source.
//!
//! Sends queries to a remote search endpoint as a JSON-RPC 2.0 `call` with
//! `method = "search_read"`. Queries are encoded as a prefix-notation domain:
//! each condition becomes `[field, op, value]`, an OR-group of n conditions is
//! preceded by n-1 `"|"` markers, and top-level terms are implicitly ANDed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::{CatalogRecord, CatalogSource, Suggestion, title_slots};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::query::{Condition, FilterOperator, FilterValue, Query, QueryClause};

/// Fields requested for each record unless overridden.
const DEFAULT_FIELDS: &[&str] = &[
    "id",
    "name",
    "author_ids",
    "author_names",
    "keywords",
    "category_id",
    "availability",
    "registration_date",
];

/// Model searched for author suggestions unless overridden.
const DEFAULT_AUTHOR_MODEL: &str = "library.author";

/// Catalog source calling a remote JSON-RPC search endpoint.
pub struct RpcCatalogSource {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    author_model: String,
    fields: Vec<String>,
    next_id: AtomicU64,
}

impl RpcCatalogSource {
    /// Create a source for `model` at `endpoint`.
    ///
    /// `timeout` bounds each HTTP exchange; the loader applies its own fetch
    /// timeout on top.
    pub fn new(endpoint: &str, model: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid catalog RPC endpoint: {endpoint}"))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            author_model: DEFAULT_AUTHOR_MODEL.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a source from configuration. Requires `CATALOG_RPC_URL`.
    pub fn from_config(config: &CatalogConfig) -> anyhow::Result<Self> {
        let endpoint = config
            .rpc_url
            .as_deref()
            .context("CATALOG_RPC_URL environment variable is required")?;
        Ok(Self::new(endpoint, config.rpc_model.clone(), config.fetch_timeout)?
            .with_author_model(config.rpc_author_model.clone()))
    }

    /// Override the model searched for author suggestions.
    pub fn with_author_model(mut self, model: impl Into<String>) -> Self {
        self.author_model = model.into();
        self
    }

    /// Override the fields requested for each record.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issue one `search_read` call and return the raw rows.
    async fn search_read(
        &self,
        model: &str,
        domain: Vec<Value>,
        fields: &[String],
        limit: u32,
        order: String,
    ) -> CatalogResult<Vec<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "id": id,
            "params": {
                "model": model,
                "method": "search_read",
                "args": [domain],
                "kwargs": {
                    "fields": fields,
                    "limit": limit,
                    "order": order,
                },
            },
        });

        tracing::debug!(rpc_id = id, model, "catalog search_read");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        decode_response(&bytes)
    }
}

#[async_trait]
impl CatalogSource for RpcCatalogSource {
    async fn fetch(&self, query: &Query) -> CatalogResult<Vec<CatalogRecord>> {
        let rows = self
            .search_read(
                &self.model,
                encode_domain(query),
                &self.fields,
                query.limit,
                query.sort.to_order_string(),
            )
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match CatalogRecord::from_json(row) {
                Some(record) => records.push(record),
                None => tracing::warn!(model = %self.model, "skipping catalog row without integer id"),
            }
        }
        Ok(records)
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> CatalogResult<Vec<Suggestion>> {
        let domain = vec![json!(["name", "ilike", prefix])];
        let fields = vec!["id".to_string(), "name".to_string()];

        let titles = self
            .search_read(
                &self.model,
                domain.clone(),
                &fields,
                suggest_limit(title_slots(limit)),
                "name asc".to_string(),
            )
            .await?;
        let mut suggestions: Vec<Suggestion> = titles
            .iter()
            .filter_map(|row| named_row(row).map(|(id, name)| Suggestion::title(id, name)))
            .collect();

        let remaining = limit.saturating_sub(suggestions.len());
        if remaining > 0 {
            let authors = self
                .search_read(
                    &self.author_model,
                    domain,
                    &fields,
                    suggest_limit(remaining),
                    "name asc".to_string(),
                )
                .await?;
            suggestions.extend(
                authors
                    .iter()
                    .filter_map(|row| named_row(row).map(|(id, name)| Suggestion::author(id, name))),
            );
        }
        Ok(suggestions)
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}

fn suggest_limit(limit: usize) -> u32 {
    u32::try_from(limit).unwrap_or(u32::MAX)
}

/// `(id, name)` of a row, when both are present.
fn named_row(row: &Value) -> Option<(i64, &str)> {
    Some((row.get("id")?.as_i64()?, row.get("name")?.as_str()?))
}

/// Encode a query's clauses as a prefix-notation domain.
pub fn encode_domain(query: &Query) -> Vec<Value> {
    let mut domain = Vec::new();
    for clause in &query.clauses {
        match clause {
            QueryClause::Condition(cond) => domain.push(encode_condition(cond)),
            QueryClause::AnyOf(conds) => {
                for _ in 1..conds.len() {
                    domain.push(Value::String("|".to_string()));
                }
                domain.extend(conds.iter().map(encode_condition));
            }
        }
    }
    domain
}

fn encode_condition(cond: &Condition) -> Value {
    let operator = match cond.operator {
        FilterOperator::Equals => "=",
        FilterOperator::Contains => "ilike",
    };
    let value = match &cond.value {
        FilterValue::Integer(i) => json!(i),
        FilterValue::String(s) => json!(s),
    };
    json!([cond.field, operator, value])
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

fn decode_response(bytes: &[u8]) -> CatalogResult<Vec<Value>> {
    let response: RpcResponse = serde_json::from_slice(bytes)?;

    if let Some(error) = response.error {
        let detail = error
            .data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str);
        let message = match detail {
            Some(detail) => format!("{}: {detail}", error.message),
            None => error.message,
        };
        return Err(CatalogError::Remote {
            code: error.code,
            message,
        });
    }

    Ok(response.result.unwrap_or_default())
}
