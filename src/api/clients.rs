use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::api::error::AppError;
use crate::api::state::AppState;
use crate::core::model::{Client, ClientStatus};

#[derive(Debug, Deserialize)]
pub struct ClientPayload {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Option<ClientStatus>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be blank".to_string()));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation(format!("invalid email: {email}"))),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ClientPayload>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;

    let mut tx = state.store.begin();
    let client = tx.insert_client(
        payload.name,
        payload.email,
        payload.status.unwrap_or(ClientStatus::Active),
    );
    tx.commit()?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<Json<Client>, AppError> {
    let tx = state.store.begin();
    let client = tx.get_client(client_id).ok_or(AppError::NotFound("Client"))?;
    Ok(Json(client))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Client>>, AppError> {
    let tx = state.store.begin();
    Ok(Json(tx.list_clients(params.q.as_deref(), params.status)))
}

/// PUT replaces every mutable field of the resource.
pub async fn replace(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Json(payload): Json<ClientPayload>,
) -> Result<Json<Client>, AppError> {
    validate_name(&payload.name)?;
    validate_email(&payload.email)?;

    let mut tx = state.store.begin();
    let mut client = tx.get_client(client_id).ok_or(AppError::NotFound("Client"))?;
    client.name = payload.name;
    client.email = payload.email;
    client.status = payload.status.unwrap_or(ClientStatus::Active);
    tx.update_client(client.clone());
    tx.commit()?;
    Ok(Json(client))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Json(payload): Json<ClientPatch>,
) -> Result<Json<Client>, AppError> {
    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }

    let mut tx = state.store.begin();
    let mut client = tx.get_client(client_id).ok_or(AppError::NotFound("Client"))?;
    if let Some(name) = payload.name {
        client.name = name;
    }
    if let Some(email) = payload.email {
        client.email = email;
    }
    if let Some(status) = payload.status {
        client.status = status;
    }
    tx.update_client(client.clone());
    tx.commit()?;
    Ok(Json(client))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.store.begin();
    if tx.get_client(client_id).is_none() {
        return Err(AppError::NotFound("Client"));
    }
    tx.delete_client(client_id);
    tx.commit()?;
    Ok(StatusCode::NO_CONTENT)
}
