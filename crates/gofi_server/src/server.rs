use crate::ServerConfig;
use crate::i18n::{self, Language};
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header::ACCEPT_LANGUAGE};
use axum::response::{IntoResponse, Response};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use gofi_api::{ApiResponse, ConfigurationSnapshot};
use gofi_backend::{ProcessContext, UpdateMode, WorkflowOptions, apply_settings};
use gofi_domain::{ConfigurationView, SettingsErrorKind};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub(crate) struct AppStateHolder {
    ctx: Arc<ProcessContext>,
    config: ServerConfig,
}

pub fn router(ctx: Arc<ProcessContext>, config: ServerConfig) -> Router {
    let state = AppStateHolder { ctx, config };

    let api = Router::new()
        .route("/health", get(health))
        .route(
            "/configuration",
            get(get_configuration).post(update_setting),
        )
        .route("/setup", post(setup))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

pub fn snapshot(view: &ConfigurationView) -> ConfigurationSnapshot {
    let configuration = &view.configuration;
    ConfigurationSnapshot {
        id: configuration.id,
        version: view.dynamic.version.clone(),
        app_path: view.dynamic.app_path.clone(),
        default_storage_path: view.dynamic.default_storage_path.clone(),
        theme_style: configuration.theme_style.clone(),
        theme_color: configuration.theme_color.clone(),
        nav_mode: configuration.nav_mode.clone(),
        database_file_path: configuration.database_file_path.clone(),
        custom_storage_path: configuration.custom_storage_path.clone(),
        log_directory_path: configuration.log_directory_path.clone(),
        initialized: configuration.initialized,
        created: configuration.created,
        updated: configuration.updated,
    }
}

async fn get_configuration(
    State(state): State<AppStateHolder>,
) -> Json<ApiResponse<ConfigurationSnapshot>> {
    Json(ApiResponse::ok(snapshot(&state.ctx.configuration())))
}

async fn update_setting(
    State(state): State<AppStateHolder>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    apply(state, &headers, body, UpdateMode::Update).await
}

async fn setup(State(state): State<AppStateHolder>, headers: HeaderMap, body: Bytes) -> Response {
    apply(state, &headers, body, UpdateMode::Setup).await
}

async fn apply(
    state: AppStateHolder,
    headers: &HeaderMap,
    body: Bytes,
    mode: UpdateMode,
) -> Response {
    let lang = Language::from_accept_language(
        headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    );
    let options = WorkflowOptions {
        preview: state.config.preview,
    };
    let ctx = state.ctx.clone();

    let applied = tokio::task::spawn_blocking(move || apply_settings(&ctx, mode, options, &body))
        .await;

    match applied {
        Ok(Ok(view)) => Json(ApiResponse::ok(snapshot(&view))).into_response(),
        Ok(Err(err)) => {
            match err.kind() {
                SettingsErrorKind::Persistence => {
                    tracing::error!(?mode, error = %err, "settings update failed")
                }
                _ => tracing::warn!(?mode, error = %err, "settings update rejected"),
            }
            Json(ApiResponse::<ConfigurationSnapshot>::fail(
                i18n::error_message(lang, &err),
            ))
            .into_response()
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<ConfigurationSnapshot>::fail(err.to_string())),
        )
            .into_response(),
    }
}
