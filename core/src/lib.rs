//! Async client for the LighterBase `/api/auto` table API.
//!
//! # Overview
//! Four operations (insert, delete, update, search) against
//! `{base_url}/api/auto/{operation}/{table}`, each authenticated with a
//! bearer token resolved fresh per request.
//!
//! # Design
//! - `TableClient` is immutable after construction and cheap to clone.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response); the async methods run one
//!   `Transport::send` in between, so hosts can also drive the round-trip
//!   themselves.
//! - `TokenProvider` covers fixed tokens, per-request callbacks and the
//!   `authToken` cookie fallback behind the `CookieSource` seam.
//! - Failures are logged through `tracing` and returned as `ApiError`.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use auth::{CookieSource, StaticCookies, TokenProvider};
pub use client::{TableClient, TableClientBuilder};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{
    BaseResponse, CreateSuccessResponse, DeletePayload, InsertPayload, Row, SearchPayload,
    UpdatePayload, ViewSuccessResponse,
};
