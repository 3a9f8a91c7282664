use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::api::error::AppError;
use crate::api::state::AppState;
use crate::ledger::{self, AllocationPatch, AllocationView, NewAllocation};
use crate::store::Tx;

#[derive(Debug, Deserialize)]
pub struct AllocationPayload {
    pub ticker: String,
    pub quantity: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
}

#[derive(Debug, Deserialize, Default)]
pub struct AllocationPatchPayload {
    pub quantity: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub buy_date: Option<NaiveDate>,
}

fn ensure_positive(field: &str, value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!("{field} must be positive")));
    }
    Ok(())
}

/// 404 before anything else when the path client does not exist.
fn ensure_client_exists(tx: &Tx, client_id: i64) -> Result<(), AppError> {
    if tx.get_client(client_id).is_none() {
        return Err(AppError::NotFound("Client"));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<Json<Vec<AllocationView>>, AppError> {
    let tx = state.store.begin();
    ensure_client_exists(&tx, client_id)?;
    Ok(Json(ledger::list_allocations(&tx, client_id)))
}

pub async fn create(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    Json(payload): Json<AllocationPayload>,
) -> Result<(StatusCode, Json<AllocationView>), AppError> {
    // Rejected before any asset reconciliation happens.
    if payload.ticker.trim().is_empty() {
        return Err(AppError::Validation("ticker must not be blank".to_string()));
    }
    ensure_positive("quantity", payload.quantity)?;
    ensure_positive("buy_price", payload.buy_price)?;

    let mut tx = state.store.begin();
    ensure_client_exists(&tx, client_id)?;
    let view = ledger::create_allocation(
        &mut tx,
        client_id,
        &NewAllocation {
            ticker: payload.ticker,
            quantity: payload.quantity,
            buy_price: payload.buy_price,
            buy_date: payload.buy_date,
        },
    );
    tx.commit()?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn patch(
    State(state): State<AppState>,
    Path((client_id, allocation_id)): Path<(i64, i64)>,
    Json(payload): Json<AllocationPatchPayload>,
) -> Result<Json<AllocationView>, AppError> {
    if let Some(quantity) = payload.quantity {
        ensure_positive("quantity", quantity)?;
    }
    if let Some(buy_price) = payload.buy_price {
        ensure_positive("buy_price", buy_price)?;
    }

    let mut tx = state.store.begin();
    ensure_client_exists(&tx, client_id)?;
    let view = ledger::update_allocation(
        &mut tx,
        client_id,
        allocation_id,
        &AllocationPatch {
            quantity: payload.quantity,
            buy_price: payload.buy_price,
            buy_date: payload.buy_date,
        },
    )
    .ok_or(AppError::NotFound("Allocation"))?;
    tx.commit()?;
    Ok(Json(view))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((client_id, allocation_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.store.begin();
    ensure_client_exists(&tx, client_id)?;
    if !ledger::delete_allocation(&mut tx, client_id, allocation_id) {
        return Err(AppError::NotFound("Allocation"));
    }
    tx.commit()?;
    Ok(StatusCode::NO_CONTENT)
}
