//! Request builder, response parser and async operations for the table API.
//!
//! # Design
//! `TableClient` holds only immutable configuration: the base URL, a
//! `TokenProvider`, and a shared `Transport`. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`; both are pure. The async operations glue
//! them together around a single `Transport::send`, so concurrent calls on one
//! client share nothing mutable.

use std::fmt;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::types::{
    CreateSuccessResponse, DeletePayload, InsertPayload, SearchPayload,
    UpdatePayload, ViewSuccessResponse,
};

/// Path prefix shared by every table endpoint.
const API_PREFIX: &str = "api/auto";

/// Table whose inserts are sent without credentials (sign-up).
const PUBLIC_INSERT_TABLE: &str = "users";

/// Characters escaped when a table name is placed into the path.
const TABLE_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

/// Async client for the LighterBase `/api/auto` endpoints.
#[derive(Clone)]
pub struct TableClient {
    base_url: String,
    token_provider: TokenProvider,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for TableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableClient")
            .field("base_url", &self.base_url)
            .field("token_provider", &self.token_provider)
            .finish_non_exhaustive()
    }
}

/// Builder for `TableClient`.
pub struct TableClientBuilder {
    base_url: String,
    token_provider: Option<TokenProvider>,
    transport: Option<Arc<dyn Transport>>,
}

impl TableClientBuilder {
    pub fn token_provider(mut self, provider: impl Into<TokenProvider>) -> Self {
        self.token_provider = Some(provider.into());
        self
    }

    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the base URL and build the client. No I/O happens here.
    pub fn build(self) -> Result<TableClient> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Config(
                "a non-empty base URL is required".to_string(),
            ));
        }

        Ok(TableClient {
            base_url: trimmed.trim_end_matches('/').to_string(),
            token_provider: self.token_provider.unwrap_or_default(),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
        })
    }
}

impl TableClient {
    /// Create a client using the reqwest transport. `None` selects the
    /// cookie-based default token provider.
    pub fn new(base_url: &str, token_provider: Option<TokenProvider>) -> Result<Self> {
        let builder = Self::builder(base_url);
        match token_provider {
            Some(provider) => builder.token_provider(provider).build(),
            None => builder.build(),
        }
    }

    pub fn builder(base_url: impl Into<String>) -> TableClientBuilder {
        TableClientBuilder {
            base_url: base_url.into(),
            token_provider: None,
            transport: None,
        }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::new(&config.base_url, config.token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    /// `POST create/{table}`. Credentials are omitted for the `users` table.
    pub fn build_insert_table(&self, payload: &InsertPayload, table: &str) -> Result<HttpRequest> {
        let skip_auth = table == PUBLIC_INSERT_TABLE;
        self.build_request(
            HttpMethod::Post,
            &format!("create/{}", encode_table(table)),
            Some(payload),
            skip_auth,
        )
    }

    /// `DELETE delete/{table}` with the `WHERE` payload as body.
    pub fn build_delete_table(&self, payload: &DeletePayload, table: &str) -> Result<HttpRequest> {
        self.build_request(
            HttpMethod::Delete,
            &format!("delete/{}", encode_table(table)),
            Some(payload),
            false,
        )
    }

    /// `PUT update/{table}`.
    pub fn build_update_table(&self, payload: &UpdatePayload, table: &str) -> Result<HttpRequest> {
        self.build_request(
            HttpMethod::Put,
            &format!("update/{}", encode_table(table)),
            Some(payload),
            false,
        )
    }

    /// `POST view/{table}?page={page}&perpage={per_page}`.
    pub fn build_search_table(
        &self,
        payload: &SearchPayload,
        table: &str,
        page: u32,
        per_page: u32,
    ) -> Result<HttpRequest> {
        self.build_request(
            HttpMethod::Post,
            &format!("view/{}?page={page}&perpage={per_page}", encode_table(table)),
            Some(payload),
            false,
        )
    }

    /// Shared request construction: token resolution, URL, headers, body.
    ///
    /// The token is resolved on every call. An empty token leaves the
    /// Authorization header out. GET requests never carry a body.
    pub fn build_request<P>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<&P>,
        skip_auth: bool,
    ) -> Result<HttpRequest>
    where
        P: Serialize + ?Sized,
    {
        let token = if skip_auth {
            String::new()
        } else {
            self.token_provider.resolve()
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if !token.is_empty() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match payload {
            Some(payload) if method != HttpMethod::Get => Some(
                serde_json::to_string(payload)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?,
            ),
            _ => None,
        };

        Ok(HttpRequest {
            method,
            url: format!("{}/{API_PREFIX}/{endpoint}", self.base_url),
            headers,
            body,
        })
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_insert_table(&self, response: HttpResponse) -> Result<CreateSuccessResponse> {
        parse_json(response)
    }

    pub fn parse_delete_table(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_update_table(&self, response: HttpResponse) -> Result<()> {
        check_status(&response)
    }

    pub fn parse_search_table<T>(&self, response: HttpResponse) -> Result<ViewSuccessResponse<T>>
    where
        T: DeserializeOwned,
    {
        parse_json(response)
    }

    // -----------------------------------------------------------------------
    // Async operations
    // -----------------------------------------------------------------------

    /// Insert one row and return the backend-assigned id.
    ///
    /// A `204 No Content` answer is reported as `ApiError::Deserialization`,
    /// since there is no creation response to return.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn insert_table(
        &self,
        payload: &InsertPayload,
        table: &str,
    ) -> Result<CreateSuccessResponse> {
        self.request(self.build_insert_table(payload, table), |r| {
            self.parse_insert_table(r)
        })
        .await
    }

    /// Delete the rows matching `payload.where_`.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn delete_table(&self, payload: &DeletePayload, table: &str) -> Result<()> {
        self.request(self.build_delete_table(payload, table), |r| {
            self.parse_delete_table(r)
        })
        .await
    }

    /// Apply `payload.set` to the rows matching `payload.where_`.
    #[instrument(skip_all, fields(table = %table))]
    pub async fn update_table(&self, payload: &UpdatePayload, table: &str) -> Result<()> {
        self.request(self.build_update_table(payload, table), |r| {
            self.parse_update_table(r)
        })
        .await
    }

    /// Fetch one page of rows. Use `Row` for `T` to get untyped rows.
    ///
    /// A `204 No Content` answer is reported as `ApiError::Deserialization`.
    #[instrument(skip_all, fields(table = %table, page = page, per_page = per_page))]
    pub async fn search_table<T>(
        &self,
        payload: &SearchPayload,
        table: &str,
        page: u32,
        per_page: u32,
    ) -> Result<ViewSuccessResponse<T>>
    where
        T: DeserializeOwned,
    {
        self.request(
            self.build_search_table(payload, table, page, per_page),
            |r| self.parse_search_table(r),
        )
        .await
    }

    /// Send a built request and parse the answer. Any failure is logged here
    /// and returned unchanged.
    async fn request<T, F>(&self, request: Result<HttpRequest>, parse: F) -> Result<T>
    where
        F: FnOnce(HttpResponse) -> Result<T>,
    {
        let outcome = async {
            let request = request?;
            debug!(method = %request.method, url = %request.url, "sending request");
            let response = self.transport.send(request).await?;
            debug!(status = response.status, "received response");
            parse(response)
        }
        .await;

        if let Err(err) = &outcome {
            error!(error = %err, status = ?err.status(), "LighterBase request failed");
        }
        outcome
    }
}

fn encode_table(table: &str) -> String {
    utf8_percent_encode(table, TABLE_SEGMENT).to_string()
}

/// Map a non-2xx status to `ApiError::Http`, preferring the backend's
/// `message` field over a generic text.
fn check_status(response: &HttpResponse) -> Result<()> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    // Only `message` is consulted; other fields may have any shape.
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("API request failed with status code {}", response.status));
    Err(ApiError::Http {
        status: response.status,
        message,
    })
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    check_status(&response)?;
    if response.status == 204 {
        return Err(ApiError::Deserialization(
            "expected a JSON body but the server answered 204 No Content".to_string(),
        ));
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
