//! PostgREST table client
//!
//! Talks to a `/rest/v1/<table>` endpoint with the project API key. When an
//! access token is present it is sent as the bearer token so row-level
//! security sees the signed-in caller; otherwise the API key is used.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::{RemoteError, RemoteResult};
use super::row::{RemoteInsert, RemotePatch, RemoteRow};
use super::table::{Filter, Query, RemoteTable};
use crate::config::Config;

/// Postgres unique violation code
const UNIQUE_VIOLATION: &str = "23505";

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

/// Remote post table over HTTP
pub struct RestTable {
    http: Client,
    endpoint: String,
    api_key: String,
    bearer: String,
}

impl RestTable {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: impl Into<String>,
        access_token: Option<String>,
    ) -> RemoteResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        let api_key = api_key.into();
        Ok(Self {
            http,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            bearer: access_token.unwrap_or_else(|| api_key.clone()),
            api_key,
        })
    }

    /// Build the client from configuration
    ///
    /// Fails with [`RemoteError::NotConfigured`] when the URL or key is missing.
    pub fn from_config(config: &Config) -> RemoteResult<Self> {
        let (Some(url), Some(key)) = (&config.remote_url, &config.remote_key) else {
            return Err(RemoteError::NotConfigured);
        };
        Self::new(url, &config.remote_table, key.clone(), config.access_token.clone())
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
            .header("Prefer", "return=representation")
    }

    async fn rows<T: DeserializeOwned>(&self, response: Response) -> RemoteResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteTable for RestTable {
    async fn select(&self, query: &Query) -> RemoteResult<Vec<RemoteRow>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(query));
        debug!(?params, "Remote select");

        let response = self
            .request(self.http.get(&self.endpoint))
            .query(&params)
            .send()
            .await?;
        self.rows(response).await
    }

    async fn insert(&self, row: &RemoteInsert) -> RemoteResult<RemoteRow> {
        debug!(slug = %row.slug, "Remote insert");
        let response = self
            .request(self.http.post(&self.endpoint))
            .json(&[row])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(match status_error(status.as_u16(), &body) {
                RemoteError::Conflict { .. } => RemoteError::Conflict {
                    slug: row.slug.clone(),
                },
                other => other,
            });
        }

        let rows: Vec<RemoteRow> = serde_json::from_str(&body)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no rows".to_string()))
    }

    async fn update(&self, filters: &[Filter], patch: &RemotePatch) -> RemoteResult<Vec<RemoteRow>> {
        let params = filter_params(filters);
        debug!(?params, "Remote update");

        let response = self
            .request(self.http.patch(&self.endpoint))
            .query(&params)
            .json(patch)
            .send()
            .await?;

        match self.rows(response).await {
            Err(RemoteError::Conflict { .. }) => Err(RemoteError::Conflict {
                slug: patch.slug.clone().unwrap_or_default(),
            }),
            other => other,
        }
    }

    async fn delete(&self, filters: &[Filter]) -> RemoteResult<u64> {
        let params = filter_params(filters);
        debug!(?params, "Remote delete");

        let response = self
            .request(self.http.delete(&self.endpoint))
            .query(&params)
            .send()
            .await?;
        let rows: Vec<Value> = self.rows(response).await?;
        Ok(rows.len() as u64)
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

/// Map an error response to a [`RemoteError`]
fn status_error(status: u16, body: &str) -> RemoteError {
    let parsed: Value = serde_json::from_str(body).unwrap_or_default();
    let code = parsed["code"].as_str().unwrap_or_default();

    if status == 409 || code == UNIQUE_VIOLATION {
        return RemoteError::Conflict {
            slug: String::new(),
        };
    }

    let message = parsed["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());
    RemoteError::Status { status, message }
}

/// Query-string parameters for a select
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = filter_params(&query.filters);
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Query-string parameters for a list of filters
pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.to_string(), format!("eq.{}", literal(value))),
            Filter::Neq(column, value) => (column.to_string(), format!("neq.{}", literal(value))),
            Filter::Contains { columns, term } => {
                let pattern = quote(&format!("*{}*", term));
                let any: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{}.ilike.{}", column, pattern))
                    .collect();
                ("or".to_string(), format!("({})", any.join(",")))
            }
        })
        .collect()
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Double-quote a value inside a logic tree so reserved characters survive
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}
