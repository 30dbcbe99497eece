use crate::config::Settings;
use crate::error::RequestError;
use crate::models::{AddRequest, RequestForm};
use crate::radarr::{MovieLibrary, RadarrClient};
use crate::reconcile::{LibraryDefaults, Reconciler};
use crate::sonarr::{SeriesLibrary, SonarrClient};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

type ApiResponse = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let tmdb: Arc<dyn TmdbApi> = Arc::new(
            TmdbClient::new(settings.tmdb_api_key.clone())
                .context("Failed to build TMDB client")?,
        );
        let movies: Arc<dyn MovieLibrary> =
            Arc::new(RadarrClient::new(&settings.radarr).context("Failed to build Radarr client")?);
        let series: Arc<dyn SeriesLibrary> = Arc::new(
            SonarrClient::new(&settings.sonarr, settings.language_profile_id)
                .context("Failed to build Sonarr client")?,
        );
        let reconciler = Reconciler::new(movies, series, LibraryDefaults::from(settings));
        Ok(Self {
            tmdb,
            reconciler: Arc::new(reconciler),
        })
    }
}

pub async fn run_server(settings: Settings) -> Result<()> {
    let state = AppState::from_settings(&settings)?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/show", get(show_details))
        .route("/episodes", get(season_episodes))
        .route("/request", post(submit_request))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowQuery {
    tmdb_id: Option<String>,
    season: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchQuery>) -> ApiResponse {
    let query = params.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return (StatusCode::OK, Json(json!([])));
    }
    match state.tmdb.search(query).await {
        Ok(items) => (StatusCode::OK, Json(json!(items))),
        Err(e) => error_response("TMDB search error", e),
    }
}

async fn show_details(
    State(state): State<AppState>,
    Query(params): Query<ShowQuery>,
) -> ApiResponse {
    let Some(id) = parse_param(params.tmdb_id.as_deref()) else {
        return error_response("Bad request", RequestError::invalid_input("Invalid tmdb_id"));
    };
    match state.tmdb.fetch_show(id).await {
        Ok(show) => (StatusCode::OK, Json(json!(show))),
        Err(e) => error_response("Failed to get show details from TMDB", e),
    }
}

async fn season_episodes(
    State(state): State<AppState>,
    Query(params): Query<ShowQuery>,
) -> ApiResponse {
    let (Some(id), Some(season)) = (
        parse_param(params.tmdb_id.as_deref()),
        parse_param(params.season.as_deref()),
    ) else {
        return error_response(
            "Bad request",
            RequestError::invalid_input("Invalid tmdb_id or season number"),
        );
    };
    match state.tmdb.fetch_season(id, season).await {
        Ok(detail) => (StatusCode::OK, Json(json!(detail.episodes))),
        Err(e) => error_response("Failed to get season details", e),
    }
}

async fn submit_request(State(state): State<AppState>, Form(form): Form<RequestForm>) -> ApiResponse {
    let request = match AddRequest::try_from(form) {
        Ok(r) => r,
        Err(e) => return error_response("Bad request", e),
    };
    match state.reconciler.reconcile(&request).await {
        Ok(message) => {
            info!("Request for {} completed: {}", request, message);
            (
                StatusCode::OK,
                Json(json!({"status": "success", "message": message})),
            )
        }
        Err(e) => error_response("Failed to process request", e),
    }
}

fn parse_param(value: Option<&str>) -> Option<i32> {
    value.and_then(|v| v.trim().parse().ok())
}

fn error_response(context: &str, err: RequestError) -> ApiResponse {
    let status = match &err {
        RequestError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RequestError::NotFound(_)
        | RequestError::SeasonNotFound(_)
        | RequestError::EpisodeNotFound { .. } => StatusCode::NOT_FOUND,
        RequestError::AlreadyExists => StatusCode::CONFLICT,
        RequestError::Upstream { .. } | RequestError::Transport(_) => StatusCode::BAD_GATEWAY,
        RequestError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}: {}", context, err);
    } else {
        warn!("{}: {}", context, err);
    }
    (
        status,
        Json(json!({"status": "error", "message": format!("{}: {}", context, err)})),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
