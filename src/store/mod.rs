//! In-memory transactional store standing in for the relational engine.
//!
//! The store is the unit-of-work seam described by the service boundary:
//! transactions stage their writes, inserts receive their identity as soon
//! as they are staged (flush), and `commit` applies everything atomically with the
//! uniqueness constraints as the final arbiter. Dropping a transaction
//! without committing rolls it back. Lock guards are never held across
//! await points.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::core::model::{Allocation, Asset, Client, ClientStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: &'static str },
}

#[derive(Debug, Clone, Default)]
struct Tables {
    clients: BTreeMap<i64, Client>,
    assets: BTreeMap<i64, Asset>,
    allocations: BTreeMap<i64, Allocation>,
    client_seq: i64,
    asset_seq: i64,
    allocation_seq: i64,
}

/// Process-wide store handle; cheap to clone.
#[derive(Clone, Default)]
pub struct Store {
    tables: Arc<Mutex<Tables>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Tx {
        Tx {
            store: self.clone(),
            ops: Vec::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
enum Op {
    InsertClient(Client),
    UpdateClient(Client),
    DeleteClient(i64),
    InsertAsset(Asset),
    InsertAllocation(Allocation),
    UpdateAllocation(Allocation),
    DeleteAllocation(i64),
}

/// One transaction. Reads see committed state plus this transaction's own
/// staged inserts.
pub struct Tx {
    store: Store,
    ops: Vec<Op>,
}

impl Tx {
    pub fn get_client(&self, id: i64) -> Option<Client> {
        let committed = self.store.lock().clients.get(&id).cloned();
        committed.or_else(|| {
            self.ops.iter().rev().find_map(|op| match op {
                Op::InsertClient(c) if c.id == id => Some(c.clone()),
                _ => None,
            })
        })
    }

    /// Optional case-insensitive name/email substring filter plus status
    /// filter, ordered by id.
    pub fn list_clients(&self, q: Option<&str>, status: Option<ClientStatus>) -> Vec<Client> {
        let needle = q.map(str::to_lowercase);
        self.store
            .lock()
            .clients
            .values()
            .filter(|c| {
                needle.as_deref().is_none_or(|n| {
                    c.name.to_lowercase().contains(n) || c.email.to_lowercase().contains(n)
                })
            })
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect()
    }

    pub fn find_asset_by_ticker(&self, ticker: &str) -> Option<Asset> {
        let committed = self
            .store
            .lock()
            .assets
            .values()
            .find(|a| a.ticker == ticker)
            .cloned();
        committed.or_else(|| {
            self.ops.iter().rev().find_map(|op| match op {
                Op::InsertAsset(a) if a.ticker == ticker => Some(a.clone()),
                _ => None,
            })
        })
    }

    pub fn get_asset(&self, id: i64) -> Option<Asset> {
        let committed = self.store.lock().assets.get(&id).cloned();
        committed.or_else(|| {
            self.ops.iter().rev().find_map(|op| match op {
                Op::InsertAsset(a) if a.id == id => Some(a.clone()),
                _ => None,
            })
        })
    }

    pub fn get_allocation(&self, client_id: i64, id: i64) -> Option<Allocation> {
        self.store
            .lock()
            .allocations
            .get(&id)
            .filter(|row| row.client_id == client_id)
            .cloned()
    }

    /// A client's allocations ordered by descending id, each paired with
    /// its resolved ticker. Tickers come from one pass over the assets
    /// table under a single lock, not per-row lookups.
    pub fn list_allocations(&self, client_id: i64) -> Vec<(Allocation, String)> {
        let tables = self.store.lock();
        tables
            .allocations
            .values()
            .rev()
            .filter(|row| row.client_id == client_id)
            .map(|row| {
                let ticker = tables
                    .assets
                    .get(&row.asset_id)
                    .map(|a| a.ticker.clone())
                    .unwrap_or_default();
                (row.clone(), ticker)
            })
            .collect()
    }

    pub fn insert_client(&mut self, name: String, email: String, status: ClientStatus) -> Client {
        let id = {
            let mut tables = self.store.lock();
            tables.client_seq += 1;
            tables.client_seq
        };
        let client = Client {
            id,
            name,
            email,
            status,
            created_at: Utc::now(),
        };
        self.ops.push(Op::InsertClient(client.clone()));
        client
    }

    pub fn update_client(&mut self, client: Client) {
        self.ops.push(Op::UpdateClient(client));
    }

    pub fn delete_client(&mut self, id: i64) {
        self.ops.push(Op::DeleteClient(id));
    }

    /// Stages an asset row and flushes its identity immediately, so the id
    /// is usable by dependent writes before commit.
    pub fn insert_asset(&mut self, ticker: String) -> Asset {
        let id = {
            let mut tables = self.store.lock();
            tables.asset_seq += 1;
            tables.asset_seq
        };
        let asset = Asset {
            id,
            ticker,
            name: None,
        };
        self.ops.push(Op::InsertAsset(asset.clone()));
        asset
    }

    pub fn insert_allocation(
        &mut self,
        client_id: i64,
        asset_id: i64,
        quantity: rust_decimal::Decimal,
        buy_price: rust_decimal::Decimal,
        buy_date: chrono::NaiveDate,
    ) -> Allocation {
        let id = {
            let mut tables = self.store.lock();
            tables.allocation_seq += 1;
            tables.allocation_seq
        };
        let row = Allocation {
            id,
            client_id,
            asset_id,
            quantity,
            buy_price,
            buy_date,
        };
        self.ops.push(Op::InsertAllocation(row.clone()));
        row
    }

    pub fn update_allocation(&mut self, row: Allocation) {
        self.ops.push(Op::UpdateAllocation(row));
    }

    pub fn delete_allocation(&mut self, id: i64) {
        self.ops.push(Op::DeleteAllocation(id));
    }

    /// Applies all staged operations atomically. Uniqueness is re-checked
    /// against committed state under the table lock; on violation nothing
    /// is applied and the committed state is untouched.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut tables = self.store.lock();
        let mut next = tables.clone();
        for op in self.ops {
            apply(&mut next, op)?;
        }
        *tables = next;
        Ok(())
    }
}

fn apply(tables: &mut Tables, op: Op) -> Result<(), StoreError> {
    match op {
        Op::InsertClient(client) => {
            check_email_unique(tables, &client.email, client.id)?;
            tables.clients.insert(client.id, client);
        }
        // Updating a row a concurrent commit already deleted updates
        // nothing, it must not re-insert the row.
        Op::UpdateClient(client) => {
            if tables.clients.contains_key(&client.id) {
                check_email_unique(tables, &client.email, client.id)?;
                tables.clients.insert(client.id, client);
            }
        }
        Op::DeleteClient(id) => {
            tables.clients.remove(&id);
            tables.allocations.retain(|_, row| row.client_id != id);
        }
        Op::InsertAsset(asset) => {
            if tables.assets.values().any(|a| a.ticker == asset.ticker) {
                return Err(StoreError::UniqueViolation {
                    constraint: "assets.ticker",
                });
            }
            tables.assets.insert(asset.id, asset);
        }
        Op::InsertAllocation(row) => {
            tables.allocations.insert(row.id, row);
        }
        Op::UpdateAllocation(row) => {
            if let Some(existing) = tables.allocations.get_mut(&row.id) {
                *existing = row;
            }
        }
        Op::DeleteAllocation(id) => {
            tables.allocations.remove(&id);
        }
    }
    Ok(())
}

fn check_email_unique(tables: &Tables, email: &str, own_id: i64) -> Result<(), StoreError> {
    if tables
        .clients
        .values()
        .any(|c| c.id != own_id && c.email == email)
    {
        return Err(StoreError::UniqueViolation {
            constraint: "clients.email",
        });
    }
    Ok(())
}
