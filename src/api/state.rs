use std::sync::Arc;

use crate::providers::yahoo::YahooClient;
use crate::search::AssetSearch;
use crate::store::Store;

/// Shared handles threaded through every request. All members are
/// process-wide singletons constructed once at startup and released by
/// drop at shutdown.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub search: Arc<AssetSearch>,
    pub market: Arc<YahooClient>,
}

impl AppState {
    pub fn new(store: Store, search: Arc<AssetSearch>, market: Arc<YahooClient>) -> Self {
        Self {
            store,
            search,
            market,
        }
    }
}
