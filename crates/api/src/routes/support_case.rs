use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use bson::oid::ObjectId;
use realtydesk_services::support::{
    CaseQuery, CaseView,
    requests::{CreateCaseRequest, UpdateCaseRequest},
};
use serde::Serialize;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, MaybeAuthUser},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

pub(crate) fn parse_id(value: &str, field: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

pub async fn create(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    body: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaseView>), ApiError> {
    let Json(body) = body?;
    let case = state.cases.create_case(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CaseView>, ApiError> {
    let id = parse_id(&id, "case id")?;
    Ok(Json(state.cases.get_case(&caller, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateCaseRequest>, JsonRejection>,
) -> Result<Json<CaseView>, ApiError> {
    let id = parse_id(&id, "case id")?;
    let Json(body) = body?;
    Ok(Json(state.cases.update_case(&caller, id, body).await?))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<CaseQuery>,
) -> Result<Json<Vec<CaseView>>, ApiError> {
    Ok(Json(state.cases.list_cases(&caller, &query).await?))
}

pub async fn list_for_property(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(property_id): Path<String>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<Vec<CaseView>>, ApiError> {
    let property_id = parse_id(&property_id, "property ID")?;
    Ok(Json(
        state
            .cases
            .list_for_property(&caller, property_id, &query)
            .await?,
    ))
}

pub async fn list_unassigned(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<CaseView>>, ApiError> {
    Ok(Json(state.cases.list_unassigned(&caller).await?))
}

pub async fn count_unassigned(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.cases.count_unassigned(&caller).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((case_id, message_id)): Path<(String, String)>,
) -> Result<Json<CaseView>, ApiError> {
    let case_id = parse_id(&case_id, "case id")?;
    let message_id = parse_id(&message_id, "message id")?;
    Ok(Json(
        state
            .cases
            .delete_message(&caller, case_id, message_id)
            .await?,
    ))
}

pub async fn unseen_for_admin(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.cases.unseen_for_admin(&caller).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn unseen_for_property_agent(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(property_id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let property_id = parse_id(&property_id, "property ID")?;
    let count = state
        .cases
        .unseen_for_property_agent(&caller, property_id)
        .await?;
    Ok(Json(CountResponse { count }))
}

pub async fn unseen_for_client(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(client_id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let client_id = parse_id(&client_id, "client ID")?;
    let count = state.cases.unseen_for_client(&caller, client_id).await?;
    Ok(Json(CountResponse { count }))
}
