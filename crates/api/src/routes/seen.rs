//! Seen-mark routes. Each one picks the track and scope; the controller
//! enforces that only the track's own role may flip it.

use axum::{
    Json,
    extract::{Path, State},
};
use realtydesk_db::models::SeenTrack;
use realtydesk_services::support::{CallerRole, SeenMode, SeenResult};
use serde_json::json;

use super::support_case::parse_id;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

/// The caller's own staff track, every message.
pub async fn admin_or_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SeenResult>, ApiError> {
    let id = parse_id(&id, "case id")?;
    let track = match caller.role {
        CallerRole::SuperAdmin => SeenTrack::Admin,
        CallerRole::Agent => SeenTrack::Agent,
        _ => return Err(ApiError::Forbidden("Access denied".to_string())),
    };
    Ok(Json(
        state
            .cases
            .mark_seen(&caller, id, track, SeenMode::Blanket)
            .await?,
    ))
}

pub async fn client(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SeenResult>, ApiError> {
    let id = parse_id(&id, "case id")?;
    Ok(Json(
        state
            .cases
            .mark_seen(&caller, id, SeenTrack::Client, SeenMode::Blanket)
            .await?,
    ))
}

/// Admin track, skipping messages the admin wrote.
pub async fn by_admin(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SeenResult>, ApiError> {
    let id = parse_id(&id, "case id")?;
    Ok(Json(
        state
            .cases
            .mark_seen(&caller, id, SeenTrack::Admin, SeenMode::ExcludeOwn)
            .await?,
    ))
}

pub async fn by_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SeenResult>, ApiError> {
    let id = parse_id(&id, "case id")?;
    Ok(Json(
        state
            .cases
            .mark_seen(&caller, id, SeenTrack::Agent, SeenMode::Blanket)
            .await?,
    ))
}

pub async fn mark_all(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state.cases.mark_everything_seen(&caller).await?;
    Ok(Json(json!({
        "matched": outcome.matched,
        "modified": outcome.modified,
    })))
}
