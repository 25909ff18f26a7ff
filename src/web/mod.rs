//! JSON/SSE adapter for a browser front end.
//!
//! One task owns the engine and the world. HTTP handlers never touch the
//! world directly: commands travel over a channel and are applied between
//! ticks, and frames travel back over a watch (latest) and a broadcast (SSE).

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc, oneshot, watch},
    time::MissedTickBehavior,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{error, info, warn};

use crate::{
    buildings::{BuildingKind, BuildingSpec},
    commands::{Command, CommandOutcome},
    engine::{Engine, EngineBuilder, EngineSettings, TickSummary},
    notices::Notice,
    scenario::Scenario,
    world::{CommandError, World, WorldSnapshot},
};

#[derive(Clone, Serialize)]
pub struct UiFrame {
    pub snapshot: WorldSnapshot,
    pub notices: Vec<Notice>,
}

impl From<TickSummary> for UiFrame {
    fn from(summary: TickSummary) -> Self {
        Self {
            snapshot: summary.snapshot,
            notices: summary.notices,
        }
    }
}

#[derive(Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub frame: Option<UiFrame>,
}

#[derive(Serialize)]
struct CatalogEntry {
    kind: BuildingKind,
    upgrade_cost_at_level_1: u64,
    #[serde(flatten)]
    spec: &'static BuildingSpec,
}

struct CommandRequest {
    command: Command,
    reply: oneshot::Sender<Result<CommandOutcome, CommandError>>,
}

struct AppState {
    scenario_name: String,
    commands: mpsc::Sender<CommandRequest>,
    latest: watch::Receiver<Option<UiFrame>>,
    broadcaster: broadcast::Sender<String>,
}

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        host,
        port,
    } = config;

    scenario.validate()?;
    let world = scenario.build_world()?;
    let engine = EngineBuilder::new(EngineSettings::from_scenario(&scenario))
        .with_standard_systems(&scenario)
        .build();
    let frame = Duration::from_secs_f64(scenario.frame_secs);

    let (command_tx, command_rx) = mpsc::channel::<CommandRequest>(64);
    let (latest_tx, latest_rx) = watch::channel::<Option<UiFrame>>(None);
    let (frame_tx, _) = broadcast::channel::<String>(512);

    let sim_handle = tokio::spawn(drive_simulation(
        engine,
        world,
        frame,
        command_rx,
        latest_tx,
        frame_tx.clone(),
    ));

    let state = Arc::new(AppState {
        scenario_name: scenario.name.clone(),
        commands: command_tx,
        latest: latest_rx,
        broadcaster: frame_tx,
    });

    let router = router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, scenario = %scenario.name, "web.listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sim_handle.abort();
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/state", get(latest_state))
        .route("/api/catalog", get(catalog))
        .route("/api/commands", post(submit_command))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

async fn drive_simulation(
    mut engine: Engine,
    mut world: World,
    frame: Duration,
    mut commands: mpsc::Receiver<CommandRequest>,
    latest: watch::Sender<Option<UiFrame>>,
    frames: broadcast::Sender<String>,
) {
    let mut interval = tokio::time::interval(frame);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let wall_dt = now.duration_since(last_frame).as_secs_f64();
                last_frame = now;
                let summary = match engine.tick(&mut world, wall_dt) {
                    Ok(summary) => summary,
                    Err(err) => {
                        error!(error = ?err, scenario = engine.scenario_name(), "simulation.failed");
                        return;
                    }
                };
                publish(UiFrame::from(summary), &latest, &frames);
            }
            request = commands.recv() => {
                let Some(CommandRequest { command, reply }) = request else {
                    return;
                };
                let result = world.apply(command);
                let _ = reply.send(result);
            }
        }
    }
}

fn publish(
    frame: UiFrame,
    latest: &watch::Sender<Option<UiFrame>>,
    frames: &broadcast::Sender<String>,
) {
    match serde_json::to_string(&frame) {
        Ok(payload) => {
            let _ = frames.send(payload);
        }
        Err(err) => warn!(error = %err, "frame.encode_failed"),
    }
    latest.send_replace(Some(frame));
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("web.shutdown");
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        frame: state.latest.borrow().clone(),
    })
}

async fn catalog() -> Json<Vec<CatalogEntry>> {
    Json(
        BuildingKind::ALL
            .into_iter()
            .map(|kind| CatalogEntry {
                kind,
                upgrade_cost_at_level_1: kind.upgrade_cost(1),
                spec: kind.spec(),
            })
            .collect(),
    )
}

async fn submit_command(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Command>, JsonRejection>,
) -> Result<Json<CommandOutcome>, ApiError> {
    let Json(command) = payload.map_err(|rejection| ApiError::Malformed(rejection.body_text()))?;
    let (reply, response) = oneshot::channel();
    state
        .commands
        .send(CommandRequest { command, reply })
        .await
        .map_err(|_| ApiError::Unavailable)?;
    let outcome = response.await.map_err(|_| ApiError::Unavailable)?;
    outcome.map(Json).map_err(ApiError::Rejected)
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}

#[derive(Debug)]
enum ApiError {
    /// Body that does not decode into a command, including unknown speeds.
    Malformed(String),
    Rejected(CommandError),
    Unavailable,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Malformed(reason) => reason.clone(),
            ApiError::Rejected(err) => err.to_string(),
            ApiError::Unavailable => "simulation is not running".to_string(),
        };
        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}
