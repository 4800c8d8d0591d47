use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub type Row = Map<String, Value>;

pub type Db = Arc<RwLock<HashMap<String, Vec<Row>>>>;

/// Table whose create route accepts unauthenticated requests.
const PUBLIC_CREATE_TABLE: &str = "users";

const DEFAULT_PER_PAGE: u64 = 10;

#[derive(Clone)]
struct AppState {
    db: Db,
    token: Option<Arc<str>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
    pub id: String,
    pub status: u16,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Row>,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
}

#[derive(Deserialize)]
pub struct DeleteBody {
    #[serde(rename = "WHERE")]
    pub where_: Value,
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub set: Row,
    #[serde(rename = "WHERE")]
    pub where_: Value,
}

#[derive(Deserialize, Default)]
pub struct SearchBody {
    #[serde(rename = "SELECT", default)]
    pub select: Option<Vec<String>>,
    #[serde(rename = "WHERE", default)]
    pub where_: Option<Value>,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub perpage: Option<u64>,
}

type Failure = (StatusCode, Json<Message>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
}

/// Router without authentication.
pub fn app() -> Router {
    app_with_token(None)
}

/// Router that requires `Authorization: Bearer {token}` on every route
/// except `create/users` when `token` is set.
pub fn app_with_token(token: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        token: token.map(Arc::from),
    };
    Router::new()
        .route("/api/auto/create/{table}", post(create_row))
        .route("/api/auto/delete/{table}", delete(delete_rows))
        .route("/api/auto/update/{table}", put(update_rows))
        .route("/api/auto/view/{table}", post(view_rows))
        .with_state(state)
}

pub async fn run_with_token(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Failure> {
    let Some(expected) = state.token.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        Ok(())
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "unauthorized"))
    }
}

/// Rows match when every key of the `WHERE` object equals the row's value.
/// `null` matches everything.
fn matcher(condition: &Value) -> Result<impl Fn(&Row) -> bool + '_, Failure> {
    let filter = match condition {
        Value::Null => None,
        Value::Object(map) => Some(map),
        _ => {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "WHERE must be an object",
            ))
        }
    };
    Ok(move |row: &Row| {
        filter.map_or(true, |f| f.iter().all(|(k, v)| row.get(k) == Some(v)))
    })
}

async fn create_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(input): Json<Row>,
) -> Result<(StatusCode, Json<Created>), Failure> {
    if table != PUBLIC_CREATE_TABLE {
        authorize(&state, &headers)?;
    }

    let id = Uuid::new_v4().to_string();
    let mut row = Row::new();
    row.insert("id".to_string(), Value::String(id.clone()));
    for (k, v) in input {
        if k != "id" {
            row.insert(k, v);
        }
    }

    state.db.write().await.entry(table.clone()).or_default().push(row);
    debug!(%table, %id, "row created");

    Ok((
        StatusCode::CREATED,
        Json(Created {
            id,
            status: StatusCode::CREATED.as_u16(),
            message: "created".to_string(),
        }),
    ))
}

async fn delete_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(input): Json<DeleteBody>,
) -> Result<StatusCode, Failure> {
    authorize(&state, &headers)?;
    let matches = matcher(&input.where_)?;

    let mut db = state.db.write().await;
    let rows = db.entry(table).or_default();
    let before = rows.len();
    rows.retain(|row| !matches(row));

    if rows.len() == before {
        return Err(failure(StatusCode::NOT_FOUND, "not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn update_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateBody>,
) -> Result<StatusCode, Failure> {
    authorize(&state, &headers)?;
    let matches = matcher(&input.where_)?;

    let mut db = state.db.write().await;
    let mut updated = 0;
    for row in db.entry(table).or_default().iter_mut().filter(|r| matches(&**r)) {
        for (k, v) in &input.set {
            if k != "id" {
                row.insert(k.clone(), v.clone());
            }
        }
        updated += 1;
    }

    if updated == 0 {
        return Err(failure(StatusCode::NOT_FOUND, "not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn view_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
    Json(input): Json<SearchBody>,
) -> Result<Json<Page>, Failure> {
    authorize(&state, &headers)?;

    let page = params.page.unwrap_or(1);
    let per_page = params.perpage.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 || per_page == 0 {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "page and perpage must be positive",
        ));
    }

    let condition = input.where_.unwrap_or(Value::Null);
    let matches = matcher(&condition)?;

    let db = state.db.read().await;
    let matched: Vec<&Row> = db
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches(*r)).collect())
        .unwrap_or_default();

    let total_items = matched.len() as u64;
    let items = matched
        .into_iter()
        .skip(usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX))
        .take(usize::try_from(per_page).unwrap_or(usize::MAX))
        .map(|row| project(row, input.select.as_deref()))
        .collect();

    Ok(Json(Page {
        items,
        page,
        per_page,
        total_pages: total_items.div_ceil(per_page),
        total_items,
    }))
}

fn project(row: &Row, select: Option<&[String]>) -> Row {
    match select {
        None => row.clone(),
        Some(columns) => columns
            .iter()
            .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
            .collect(),
    }
}
