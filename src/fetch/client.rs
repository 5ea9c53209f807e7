use std::fmt::Debug;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{AppError, Context, Result};
use crate::query::QueryRequest;
use crate::records::Table;

use super::decode::{decode_count, decode_listing, decode_query};
use super::{CsmarApi, FetchOutcome};

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    account: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    columns: &'a [String],
    condition: &'a str,
    table_name: &'a str,
    start_time: Option<&'a str>,
    end_time: Option<&'a str>,
}

impl<'a> From<&'a QueryRequest> for QueryBody<'a> {
    fn from(request: &'a QueryRequest) -> Self {
        Self {
            columns: &request.columns,
            condition: &request.condition,
            table_name: &request.table,
            start_time: request.start.as_deref(),
            end_time: request.end.as_deref(),
        }
    }
}

/// Blocking client for the JSON gateway in front of the data service.
pub struct HttpCsmarClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCsmarClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::message(
                "No gateway endpoint configured; set `endpoint` in the config or CSMAR_ENDPOINT",
            ));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct blocking HTTP client")?;

        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder, what: &str) -> Result<Value> {
        let response = self
            .authorize(builder)
            .send()
            .with_context(|| format!("Failed to send {what} request"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                message: if message.trim().is_empty() {
                    status.to_string()
                } else {
                    message
                },
            });
        }

        let body = response
            .text()
            .with_context(|| format!("Failed to read {what} response body"))?;
        // Non-JSON bodies on the query endpoint are data problems, not transport ones.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    fn post_query(&self, path: &str, request: &QueryRequest) -> Result<Value> {
        let builder = self.http.post(self.url(path)).json(&QueryBody::from(request));
        self.send(builder, path)
    }
}

impl CsmarApi for HttpCsmarClient {
    fn login(&mut self, account: &str, password: &str) -> Result<()> {
        let builder = self
            .http
            .post(self.url("login"))
            .json(&LoginBody { account, password });
        let value = self.send(builder, "login")?;
        let parsed: LoginResponse =
            serde_json::from_value(value).context("Failed to parse login response")?;
        self.token = Some(parsed.token);
        log::info!("Logged in to {} as {}", self.base_url, account);
        Ok(())
    }

    fn count(&self, request: &QueryRequest) -> Result<u64> {
        let value = self.post_query("count", request)?;
        decode_count(&value)
    }

    fn fetch(&self, request: &QueryRequest) -> Result<FetchOutcome> {
        let value = self.post_query("query", request)?;
        Ok(decode_query(value))
    }

    fn list_databases(&self) -> Result<Table> {
        let value = self.send(self.http.get(self.url("databases")), "databases")?;
        decode_listing(value, "database")
    }

    fn list_tables(&self, database: &str) -> Result<Table> {
        let builder = self
            .http
            .get(self.url("tables"))
            .query(&[("database", database)]);
        let value = self.send(builder, "tables")?;
        decode_listing(value, "table")
    }

    fn list_fields(&self, table: &str) -> Result<Table> {
        let builder = self.http.get(self.url("fields")).query(&[("table", table)]);
        let value = self.send(builder, "fields")?;
        decode_listing(value, "field")
    }
}

impl Debug for HttpCsmarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCsmarClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}
