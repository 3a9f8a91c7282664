//! Ticker reconciliation and the allocation ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::core::model::{Allocation, Asset};
use crate::store::Tx;

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Resolves a ticker to its canonical asset row, creating one if absent.
///
/// Runs inside the caller's transaction: a created row is flushed (its id
/// is usable immediately) but not committed, so the asset and the dependent
/// write succeed or fail together. Two writers racing on an unseen ticker
/// are arbitrated by the ticker uniqueness constraint at commit; the loser
/// sees a conflict, not a duplicate row.
pub fn resolve_or_create_asset(tx: &mut Tx, ticker: &str) -> Asset {
    let normalized = normalize_ticker(ticker);
    if let Some(asset) = tx.find_asset_by_ticker(&normalized) {
        return asset;
    }
    debug!("Creating asset for unseen ticker {normalized}");
    tx.insert_asset(normalized)
}

/// Allocation row denormalized with its resolved ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub id: i64,
    pub client_id: i64,
    pub ticker: String,
    pub quantity: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
}

impl AllocationView {
    fn from_row(row: Allocation, ticker: String) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            ticker,
            quantity: row.quantity,
            buy_price: row.buy_price,
            buy_date: row.buy_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAllocation {
    pub ticker: String,
    pub quantity: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct AllocationPatch {
    pub quantity: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub buy_date: Option<NaiveDate>,
}

/// Creates an allocation, reconciling its asset in the same transaction.
/// Input validation belongs to the API boundary; callers must not pass
/// non-positive quantities or prices here.
pub fn create_allocation(tx: &mut Tx, client_id: i64, input: &NewAllocation) -> AllocationView {
    let asset = resolve_or_create_asset(tx, &input.ticker);
    let row = tx.insert_allocation(
        client_id,
        asset.id,
        input.quantity,
        input.buy_price,
        input.buy_date,
    );
    AllocationView::from_row(row, asset.ticker)
}

pub fn list_allocations(tx: &Tx, client_id: i64) -> Vec<AllocationView> {
    tx.list_allocations(client_id)
        .into_iter()
        .map(|(row, ticker)| AllocationView::from_row(row, ticker))
        .collect()
}

/// Partial update of quantity/buy price/buy date. The asset binding is
/// immutable; swapping the asset is modeled as delete + create.
pub fn update_allocation(
    tx: &mut Tx,
    client_id: i64,
    allocation_id: i64,
    patch: &AllocationPatch,
) -> Option<AllocationView> {
    let mut row = tx.get_allocation(client_id, allocation_id)?;
    if let Some(quantity) = patch.quantity {
        row.quantity = quantity;
    }
    if let Some(buy_price) = patch.buy_price {
        row.buy_price = buy_price;
    }
    if let Some(buy_date) = patch.buy_date {
        row.buy_date = buy_date;
    }
    let ticker = tx
        .get_asset(row.asset_id)
        .map(|a| a.ticker)
        .unwrap_or_default();
    tx.update_allocation(row.clone());
    Some(AllocationView::from_row(row, ticker))
}

/// Hard delete of the allocation row only; the asset stays even when no
/// allocation references it anymore.
pub fn delete_allocation(tx: &mut Tx, client_id: i64, allocation_id: i64) -> bool {
    match tx.get_allocation(client_id, allocation_id) {
        Some(row) => {
            tx.delete_allocation(row.id);
            true
        }
        None => false,
    }
}
