use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics::{
    self, DataProductStaffing, PersonUtilization, RoleCoverage, UtilizationFilter,
};
use crate::config::EngineConfig;
use crate::model::{
    Assignment, AssignmentKey, DataProduct, Label, Person, Role, RoleId, RoleRequirement, Skill,
};
use crate::persistence::{PersistenceError, PlannerStore};
use crate::planner::{Planner, PlannerError};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::recommendation::RoleRecommendation;
use crate::recommendation::team::TeamResult;

/// Header naming the caller for rate limiting.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
const ANONYMOUS_CLIENT: &str = "anonymous";

#[derive(Clone)]
pub struct AppState {
    planner: Arc<RwLock<Planner>>,
    config: Arc<EngineConfig>,
    read_only: bool,
    limiter: Option<Arc<RateLimiter>>,
    store: Option<Arc<dyn PlannerStore>>,
}

impl AppState {
    pub fn new(planner: Planner) -> Self {
        Self::with_shared(Arc::new(RwLock::new(planner)))
    }

    pub fn with_shared(planner: Arc<RwLock<Planner>>) -> Self {
        Self {
            planner,
            config: Arc::new(EngineConfig::default()),
            read_only: false,
            limiter: None,
            store: None,
        }
    }

    /// Serves reads and recommendations; every mutation answers 403.
    pub fn read_only(planner: Planner) -> Self {
        let mut state = Self::new(planner);
        state.read_only = true;
        state
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(Arc::new(limiter));
        self
    }

    /// Saves the planner to `store` after every successful mutation.
    pub fn with_store(mut self, store: Arc<dyn PlannerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn planner(&self) -> Arc<RwLock<Planner>> {
        self.planner.clone()
    }

    fn throttle(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        let client = headers
            .get(CLIENT_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANONYMOUS_CLIENT);
        match limiter.check(client) {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { retry_after_secs } => {
                Err(ApiError::RateLimited { retry_after_secs })
            }
        }
    }

    /// Read-only and rate checks, then `apply` under the write lock. With a
    /// store attached the change runs on a staged copy that only replaces the
    /// live planner once the save succeeded.
    fn mutate<T>(
        &self,
        headers: &HeaderMap,
        apply: impl FnOnce(&mut Planner) -> Result<T, PlannerError>,
    ) -> Result<T, ApiError> {
        if self.read_only {
            return Err(ApiError::ReadOnly);
        }
        self.throttle(headers)?;
        let planner = self.planner();
        let mut guard = planner.write();
        let Some(store) = &self.store else {
            return Ok(apply(&mut *guard)?);
        };
        let mut staged = guard.clone();
        let value = apply(&mut staged)?;
        store.save_planner(&staged)?;
        *guard = staged;
        Ok(value)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    InvalidRequirements(Vec<String>),
    ReadOnly,
    RateLimited { retry_after_secs: i64 },
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<PlannerError> for ApiError {
    fn from(value: PlannerError) -> Self {
        match value {
            PlannerError::NotFound { .. } => ApiError::NotFound(value.to_string()),
            PlannerError::Conflict { .. } | PlannerError::RoleInUse { .. } => {
                ApiError::Conflict(value.to_string())
            }
            PlannerError::InvalidData(_) => ApiError::Invalid(value.to_string()),
            PlannerError::InvalidRequirements(errors) => ApiError::InvalidRequirements(errors),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        tracing::error!(error = %value, "failed to persist planner");
        ApiError::internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message, details) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message, None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message, None),
            ApiError::Invalid(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message, None)
            }
            ApiError::InvalidRequirements(errors) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "role requirements are invalid".to_string(),
                Some(errors),
            ),
            ApiError::ReadOnly => (
                StatusCode::FORBIDDEN,
                "read_only",
                "this server is read-only".to_string(),
                None,
            ),
            ApiError::RateLimited { retry_after_secs } => {
                let body = Json(ErrorBody {
                    error: "rate_limited",
                    message: format!("too many requests, retry in {retry_after_secs}s"),
                    details: None,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                None,
            ),
        };
        let body = Json(ErrorBody {
            error,
            message,
            details,
        });
        (status, body).into_response()
    }
}

/// `Json` body whose rejection answers with the API error body.
struct ApiJson<T>(T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::invalid(rejection.body_text())),
        }
    }
}

/// CRUD routes for one id-keyed collection of the planner.
macro_rules! collection_routes {
    (
        $router:expr, $path:literal, $record:ty, $kind:literal,
        list: $list:ident, find: $find:ident, add: $add:ident,
        update: $update:ident, remove: $remove:ident $(,)?
    ) => {{
        async fn list(State(state): State<AppState>) -> Json<Vec<$record>> {
            let planner = state.planner();
            let records = planner.read().$list().to_vec();
            Json(records)
        }

        async fn fetch(
            State(state): State<AppState>,
            Path(id): Path<String>,
        ) -> Result<Json<$record>, ApiError> {
            let planner = state.planner();
            let found = planner.read().$find(&id).cloned();
            found
                .map(Json)
                .ok_or_else(|| ApiError::NotFound(format!("{} '{}' not found", $kind, id)))
        }

        async fn create(
            State(state): State<AppState>,
            headers: HeaderMap,
            ApiJson(record): ApiJson<$record>,
        ) -> Result<(StatusCode, Json<$record>), ApiError> {
            state.mutate(&headers, |planner| planner.$add(record.clone()))?;
            Ok((StatusCode::CREATED, Json(record)))
        }

        async fn update(
            State(state): State<AppState>,
            headers: HeaderMap,
            Path(id): Path<String>,
            ApiJson(record): ApiJson<$record>,
        ) -> Result<Json<$record>, ApiError> {
            if record.id != id {
                return Err(ApiError::invalid(format!(
                    "{} id in payload does not match path parameter",
                    $kind
                )));
            }
            state.mutate(&headers, |planner| planner.$update(record.clone()))?;
            Ok(Json(record))
        }

        async fn remove(
            State(state): State<AppState>,
            headers: HeaderMap,
            Path(id): Path<String>,
        ) -> Result<StatusCode, ApiError> {
            state.mutate(&headers, |planner| planner.$remove(&id))?;
            Ok(StatusCode::NO_CONTENT)
        }

        $router
            .route($path, get(list).post(create))
            .route(
                concat!($path, "/:id"),
                get(fetch).put(update).delete(remove),
            )
    }};
}

pub fn router(state: AppState) -> Router {
    let router = Router::new().route("/health", get(health));
    let router = collection_routes!(
        router, "/persons", Person, "person",
        list: persons, find: person, add: add_person,
        update: update_person, remove: remove_person,
    );
    let router = collection_routes!(
        router, "/roles", Role, "role",
        list: roles, find: role, add: add_role,
        update: update_role, remove: remove_role,
    );
    let router = collection_routes!(
        router, "/data-products", DataProduct, "data product",
        list: data_products, find: data_product, add: add_data_product,
        update: update_data_product, remove: remove_data_product,
    );
    let router = collection_routes!(
        router, "/labels", Label, "label",
        list: labels, find: label, add: add_label,
        update: update_label, remove: remove_label,
    );
    let router = collection_routes!(
        router, "/skills", Skill, "skill",
        list: skills, find: skill, add: add_skill,
        update: update_skill, remove: remove_skill,
    );
    router
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route(
            "/assignments/:person_id/:data_product_id/:role_id",
            put(update_assignment).delete(delete_assignment),
        )
        .route("/roles/fix-colors", post(fix_role_colors))
        .route("/recommendations", post(recommendations))
        .route("/team", post(team))
        .route("/analytics/utilization", get(utilization))
        .route("/analytics/roles", get(role_usage))
        .route("/analytics/data-products", get(data_product_usage))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "team-planner HTTP API listening");
    axum::serve(listener, app).await
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "read_only": state.is_read_only() }))
}

async fn list_assignments(State(state): State<AppState>) -> Json<Vec<Assignment>> {
    let planner = state.planner();
    let assignments = planner.read().assignments().to_vec();
    Json(assignments)
}

async fn create_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(assignment): ApiJson<Assignment>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    state.mutate(&headers, |planner| planner.assign(assignment.clone()))?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[derive(Debug, Deserialize)]
struct AssignmentUpdate {
    #[serde(default)]
    hours: Option<f64>,
    #[serde(default)]
    ended_on: Option<NaiveDate>,
}

async fn update_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((person_id, data_product_id, role_id)): Path<(String, String, String)>,
    ApiJson(update): ApiJson<AssignmentUpdate>,
) -> Result<Json<Assignment>, ApiError> {
    let key = AssignmentKey::new(person_id, data_product_id, role_id);
    let updated = state.mutate(&headers, |planner| {
        if let Some(hours) = update.hours {
            planner.set_assignment_hours(&key, hours)?;
        }
        if let Some(date) = update.ended_on {
            planner.end_assignment(&key, date)?;
        }
        Ok(planner.assignment(&key).cloned())
    })?;
    updated
        .map(Json)
        .ok_or_else(|| ApiError::internal("assignment not found after update"))
}

async fn delete_assignment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((person_id, data_product_id, role_id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let key = AssignmentKey::new(person_id, data_product_id, role_id);
    state.mutate(&headers, |planner| planner.unassign(&key))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct FixColorsResponse {
    changed: Vec<RoleId>,
}

async fn fix_role_colors(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<FixColorsResponse>, ApiError> {
    let changed = state.mutate(&headers, |planner| Ok(planner.fix_role_colors()))?;
    Ok(Json(FixColorsResponse { changed }))
}

#[derive(Debug, Deserialize)]
struct RequirementsPayload {
    #[serde(default)]
    requirements: Vec<RoleRequirement>,
}

async fn recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RequirementsPayload>,
) -> Result<Json<Vec<RoleRecommendation>>, ApiError> {
    state.throttle(&headers)?;
    let planner = state.planner();
    let result = planner
        .read()
        .recommendations(&payload.requirements, &state.config)?;
    Ok(Json(result))
}

async fn team(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<RequirementsPayload>,
) -> Result<Json<TeamResult>, ApiError> {
    state.throttle(&headers)?;
    let planner = state.planner();
    let result = planner.read().recommend(&payload.requirements, &state.config)?;
    Ok(Json(result))
}

async fn utilization(
    State(state): State<AppState>,
    Query(filter): Query<UtilizationFilter>,
) -> Json<Vec<PersonUtilization>> {
    let planner = state.planner();
    let guard = planner.read();
    Json(analytics::person_utilization(guard.snapshot(), &filter))
}

async fn role_usage(State(state): State<AppState>) -> Json<Vec<RoleCoverage>> {
    let planner = state.planner();
    let guard = planner.read();
    Json(analytics::role_coverage(guard.snapshot()))
}

async fn data_product_usage(State(state): State<AppState>) -> Json<Vec<DataProductStaffing>> {
    let planner = state.planner();
    let guard = planner.read();
    Json(analytics::data_product_staffing(
        guard.snapshot(),
        guard.data_products(),
    ))
}
