//! Request payloads and response envelopes for the `/api/auto` backend.
//!
//! # Design
//! The backend schema is unknown to the client, so rows and `WHERE`
//! conditions are `serde_json` values. `serde_json` is built with
//! `preserve_order`, so mapping keys keep their insertion order on the wire.
//! Wire field names (`WHERE`, `SELECT`, `perPage`) are kept via serde renames.

use serde::{Deserialize, Serialize};
pub use serde_json::{Map, Value};

/// A row: ordered mapping from column name to a dynamic value.
pub type Row = Map<String, Value>;

/// Payload for `insert_table`: arbitrary column values.
pub type InsertPayload = Row;

/// Payload for `delete_table`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeletePayload {
    #[serde(rename = "WHERE")]
    pub where_: Value,
}

/// Payload for `update_table`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdatePayload {
    pub set: Row,
    #[serde(rename = "WHERE")]
    pub where_: Value,
}

/// Payload for `search_table`. Omitted fields are left out of the JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchPayload {
    #[serde(rename = "SELECT", skip_serializing_if = "Option::is_none", default)]
    pub select: Option<Vec<String>>,
    #[serde(rename = "WHERE", skip_serializing_if = "Option::is_none", default)]
    pub where_: Option<Value>,
}

/// Optional fields every backend response may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BaseResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Row>,
}

/// Response to `insert_table`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSuccessResponse {
    pub id: String,
    #[serde(flatten)]
    pub base: BaseResponse,
}

/// One page of rows returned by `search_table`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewSuccessResponse<T = Row> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    #[serde(flatten)]
    pub base: BaseResponse,
}
