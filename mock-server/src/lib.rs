use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 50;
pub const KNOWN_SETTINGS: [&str; 3] = ["ssl", "always_use_https", "development_mode"];
pub const CSRF_TOKEN_FIELD: &str = "cfCSRFToken";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            status: "active".to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateZone {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Default)]
pub struct Store {
    pub zones: Vec<Zone>,
    pub settings: HashMap<(String, String), Value>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    app_with_zones(&[])
}

/// App pre-populated with one zone per name, in order.
pub fn app_with_zones(names: &[&str]) -> Router {
    let store = Store {
        zones: names.iter().map(|name| Zone::new(name)).collect(),
        settings: HashMap::new(),
    };
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/client/v4/zones", get(list_zones).post(create_zone))
        .route("/client/v4/zones/{id}", get(get_zone))
        .route(
            "/client/v4/zones/{id}/settings/{setting}",
            get(get_setting).patch(update_setting),
        )
        .route("/client/v4/user/tokens/verify", get(verify_token))
        .route("/client/v4/maintenance", get(maintenance))
        .route("/client/v4/plaintext", get(plaintext))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_app(listener, app()).await
}

pub async fn run_app(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

pub fn success(result: Value) -> Json<Value> {
    Json(json!({"success": true, "errors": [], "messages": [], "result": result}))
}

pub fn failure(status: StatusCode, code: u32, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "success": false,
            "errors": [{"code": code, "message": message}],
            "messages": [],
            "result": null
        })),
    )
}

/// HTTP 200 carrying `success: false`.
pub fn soft_failure(code: u32, message: &str) -> Json<Value> {
    failure(StatusCode::OK, code, message).1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Legacy,
}

impl AuthScheme {
    fn as_str(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "bearer",
            AuthScheme::Legacy => "legacy",
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Accepts exactly one of bearer token or key + email.
pub fn authenticate(headers: &HeaderMap) -> Result<AuthScheme, (StatusCode, Json<Value>)> {
    let bearer = header(headers, "authorization")
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.is_empty());
    let legacy = header(headers, "x-auth-key").is_some() && header(headers, "x-auth-email").is_some();

    match (bearer, legacy) {
        (true, false) => Ok(AuthScheme::Bearer),
        (false, true) => Ok(AuthScheme::Legacy),
        (true, true) => Err(failure(
            StatusCode::BAD_REQUEST,
            6003,
            "Invalid request headers: multiple authentication schemes",
        )),
        (false, false) => Err(failure(StatusCode::FORBIDDEN, 10000, "Authentication error")),
    }
}

fn zone_not_found(id: &str) -> (StatusCode, Json<Value>) {
    failure(
        StatusCode::NOT_FOUND,
        7003,
        &format!("Could not route to /zones/{id}, perhaps your object identifier is invalid?"),
    )
}

async fn list_zones(State(db): State<Db>, headers: HeaderMap, Query(params): Query<ListParams>) -> ApiResult {
    authenticate(&headers)?;
    let store = db.read().await;

    let per_page = params.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let page = params.page.unwrap_or(1).max(1);
    let total_count = store.zones.len();
    let total_pages = total_count.div_ceil(per_page).max(1);

    let items: Vec<&Zone> = store.zones.iter().skip((page - 1) * per_page).take(per_page).collect();

    Ok(Json(json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": items,
        "result_info": {
            "page": page,
            "per_page": per_page,
            "count": items.len(),
            "total_count": total_count,
            "total_pages": total_pages
        }
    })))
}

async fn create_zone(State(db): State<Db>, headers: HeaderMap, Json(input): Json<CreateZone>) -> ApiResult {
    authenticate(&headers)?;
    let mut store = db.write().await;
    if store.zones.iter().any(|z| z.name == input.name) {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            1061,
            &format!("{} already exists", input.name),
        ));
    }
    let zone = Zone::new(&input.name);
    store.zones.push(zone.clone());
    Ok(success(json!(zone)))
}

async fn get_zone(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    authenticate(&headers)?;
    let store = db.read().await;
    store
        .zones
        .iter()
        .find(|z| z.id == id)
        .map(|zone| success(json!(zone)))
        .ok_or_else(|| zone_not_found(&id))
}

async fn get_setting(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, setting)): Path<(String, String)>,
) -> ApiResult {
    authenticate(&headers)?;
    let store = db.read().await;
    if !store.zones.iter().any(|z| z.id == id) {
        return Err(zone_not_found(&id));
    }
    if !KNOWN_SETTINGS.contains(&setting.as_str()) {
        return Ok(soft_failure(1006, "Unrecognized zone setting name"));
    }
    let value = store
        .settings
        .get(&(id, setting.clone()))
        .cloned()
        .unwrap_or_else(|| json!("off"));
    Ok(success(json!({"id": setting, "value": value, "editable": true})))
}

/// Unknown setting names come back as HTTP 200 with `success: false`.
async fn update_setting(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, setting)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult {
    authenticate(&headers)?;
    if body.get(CSRF_TOKEN_FIELD).is_some() {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            1007,
            &format!("Unknown field {CSRF_TOKEN_FIELD}"),
        ));
    }
    let Some(value) = body.get("value").cloned() else {
        return Err(failure(StatusCode::BAD_REQUEST, 1007, "Missing field value"));
    };

    let mut store = db.write().await;
    if !store.zones.iter().any(|z| z.id == id) {
        return Err(zone_not_found(&id));
    }
    if !KNOWN_SETTINGS.contains(&setting.as_str()) {
        return Ok(soft_failure(1006, "Unrecognized zone setting name"));
    }
    store.settings.insert((id, setting.clone()), value.clone());
    Ok(success(json!({"id": setting, "value": value, "editable": true})))
}

async fn verify_token(headers: HeaderMap) -> ApiResult {
    let scheme = authenticate(&headers)?;
    Ok(success(json!({"status": "active", "scheme": scheme.as_str()})))
}

async fn maintenance() -> (StatusCode, &'static str) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        "<html><body>Down for maintenance</body></html>",
    )
}

async fn plaintext() -> &'static str {
    "definitely not json"
}
