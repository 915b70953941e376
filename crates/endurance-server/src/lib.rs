//! HTTP panel server.
//!
//! Hosts one live instance of every preset panel, all sharing the mission log,
//! and drives their clocks from a background pump task. Clients read snapshots
//! and drive controls over JSON.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use endurance_core::{
    Clock, EngineConfig, EngineError, LogEntry, PRESET_NAMES, Panel, SharedLogStore,
    SystemClock, is_crew, preset,
};

/// Shared server state.
pub struct AppState {
    panels: Mutex<HashMap<String, Panel>>,
    log: SharedLogStore,
}

impl AppState {
    /// Build every preset panel on `clock`, all appending to `log`.
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        log: SharedLogStore,
    ) -> Result<Self, EngineError> {
        let mut panels = HashMap::new();
        for name in PRESET_NAMES {
            let panel = preset(name, clock.clone(), config.seed, Some(log.clone()))?;
            panels.insert(name.to_string(), panel);
        }
        Ok(Self {
            panels: Mutex::new(panels),
            log,
        })
    }

    /// Run due drift steps and momentary resets on every panel.
    pub async fn pump_all(&self) -> usize {
        let mut panels = self.panels.lock().await;
        panels
            .values_mut()
            .map(|p| {
                let report = p.pump();
                for id in &report.resets {
                    log::debug!("{}: momentary `{id}` reset", p.name());
                }
                report.drift_steps + report.resets.len()
            })
            .sum()
    }

    /// Dispose every panel; later pumps are no-ops.
    pub async fn dispose_all(&self) {
        for panel in self.panels.lock().await.values_mut() {
            panel.dispose();
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// JSON error body: `{"error": "...", "code": "END-0005"}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: message.into(),
                code: "bad_request",
            },
        }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::UnknownPanel { .. }
        | EngineError::UnknownControl { .. }
        | EngineError::UnknownChannel { .. } => StatusCode::NOT_FOUND,
        EngineError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody {
                error: err.to_string(),
                code: err.code(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WriteBody {
    value: f64,
}

#[derive(Deserialize)]
struct ToggleBody {
    on: bool,
}

#[derive(Deserialize)]
struct AppendBody {
    author: String,
    content: String,
}

#[derive(Deserialize)]
struct LogParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct PanelEntry {
    name: String,
    title: String,
    session_id: String,
    channels: usize,
    controls: usize,
}

#[derive(Debug, Serialize)]
struct AppendResponse {
    entry: LogEntry,
    /// Set when the entry was accepted but could not be written to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Endurance Server",
        "version": endurance_core::VERSION,
        "panels": PRESET_NAMES,
        "endpoints": {
            "/": "This API index",
            "/panels": "List live panels",
            "/panels/{panel}": "Snapshot of one panel",
            "/panels/{panel}/controls/{control}/write": {
                "method": "POST",
                "body": {"value": "number, clamped to the channel bounds"},
            },
            "/panels/{panel}/controls/{control}/toggle": {
                "method": "POST",
                "body": {"on": "bool"},
            },
            "/panels/{panel}/controls/{control}/activate": {
                "method": "POST",
                "description": "Fire a momentary control",
            },
            "/log": {
                "GET": "Mission log, most recent first (?limit=N)",
                "POST": {"author": "crew member", "content": "text"},
            },
        },
    }))
}

async fn handle_panels(State(state): State<Arc<AppState>>) -> Json<Vec<PanelEntry>> {
    let panels = state.panels.lock().await;
    let entries = PRESET_NAMES
        .iter()
        .filter_map(|name| panels.get(*name))
        .map(|p| PanelEntry {
            name: p.name().to_string(),
            title: p.title().to_string(),
            session_id: p.session_id().to_string(),
            channels: p.channels().len(),
            controls: p.bindings().len(),
        })
        .collect();
    Json(entries)
}

fn panel_mut<'a>(
    panels: &'a mut HashMap<String, Panel>,
    name: &str,
) -> Result<&'a mut Panel, EngineError> {
    panels.get_mut(name).ok_or_else(|| EngineError::UnknownPanel {
        panel: name.to_string(),
    })
}

async fn handle_snapshot(
    State(state): State<Arc<AppState>>,
    Path(panel): Path<String>,
) -> ApiResult<Json<endurance_core::PanelSnapshot>> {
    let mut panels = state.panels.lock().await;
    Ok(Json(panel_mut(&mut panels, &panel)?.snapshot()))
}

async fn handle_write(
    State(state): State<Arc<AppState>>,
    Path((panel, control)): Path<(String, String)>,
    Json(body): Json<WriteBody>,
) -> ApiResult<Json<serde_json::Value>> {
    if !body.value.is_finite() {
        return Err(ApiError::bad_request("value must be a finite number"));
    }
    let mut panels = state.panels.lock().await;
    let value = panel_mut(&mut panels, &panel)?.write(&control, body.value)?;
    Ok(Json(serde_json::json!({ "control": control, "value": value })))
}

async fn handle_toggle(
    State(state): State<Arc<AppState>>,
    Path((panel, control)): Path<(String, String)>,
    Json(body): Json<ToggleBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut panels = state.panels.lock().await;
    panel_mut(&mut panels, &panel)?.toggle(&control, body.on)?;
    Ok(Json(serde_json::json!({ "control": control, "on": body.on })))
}

async fn handle_activate(
    State(state): State<Arc<AppState>>,
    Path((panel, control)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut panels = state.panels.lock().await;
    let fired = panel_mut(&mut panels, &panel)?.activate(&control)?;
    Ok(Json(serde_json::json!({ "control": control, "activated": fired })))
}

async fn handle_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogParams>,
) -> Json<Vec<LogEntry>> {
    let store = state.log.lock().unwrap_or_else(|p| p.into_inner());
    let entries = match params.limit {
        Some(n) => store.recent(n),
        None => store.entries(),
    };
    Json(entries.to_vec())
}

async fn handle_append(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AppendBody>,
) -> ApiResult<(StatusCode, Json<AppendResponse>)> {
    if !is_crew(&body.author) {
        return Err(ApiError::bad_request(format!(
            "`{}` is not on the crew roster",
            body.author
        )));
    }
    let receipt = state
        .log
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .append(&body.author, &body.content)?;

    let warning = receipt.persistence.map(|e| {
        log::warn!("{e}");
        e.to_string()
    });
    Ok((
        StatusCode::CREATED,
        Json(AppendResponse {
            entry: receipt.entry,
            warning,
        }),
    ))
}

/// Build the axum router over a prepared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/panels", get(handle_panels))
        .route("/panels/{panel}", get(handle_snapshot))
        .route("/panels/{panel}/controls/{control}/write", post(handle_write))
        .route("/panels/{panel}/controls/{control}/toggle", post(handle_toggle))
        .route(
            "/panels/{panel}/controls/{control}/activate",
            post(handle_activate),
        )
        .route("/log", get(handle_log).post(handle_append))
        .with_state(state)
}

/// Run the HTTP panel server until the process is interrupted.
pub async fn run_server(config: EngineConfig, host: &str, port: u16) -> std::io::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut store = config.open_log(clock.clone());
    for e in store.take_persistence_errors() {
        log::warn!("{e}");
    }
    let state = AppState::new(&config, clock, store.into_shared())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = Arc::new(state);

    let pump_state = state.clone();
    let period = config.pump_interval();
    let pump = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            pump_state.pump_all().await;
        }
    });

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {addr}");
    let served = axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    pump.abort();
    state.dispose_all().await;
    served
}
