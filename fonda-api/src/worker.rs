use fonda_order::OrderFilter;
use fonda_shared::ChangeTable;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// Keeps the storefront catalog and the admin order board in step with the
/// change feed.
///
/// Subscribes before the initial load so nothing written in between is
/// missed; replaying an event already in the snapshot is harmless.
pub fn spawn_cache_sync(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = state.feed.subscribe();
        refetch(&state).await;
        info!("Cache sync worker started");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("{} {:?}", event.table.as_str(), event.event_type);
                    match event.table {
                        ChangeTable::Products => state.catalog.apply(&event).await,
                        ChangeTable::Orders => state.board.apply(&event).await,
                        ChangeTable::Customers => {}
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Cache sync missed {} change events, refetching", missed);
                    refetch(&state).await;
                }
                Err(RecvError::Closed) => {
                    info!("Change feed closed, cache sync stopping");
                    break;
                }
            }
        }
    })
}

/// Replace both caches with a full read. A failed read keeps the stale copy.
pub async fn refetch(state: &AppState) {
    match state.products.list_products().await {
        Ok(products) => state.catalog.replace(products).await,
        Err(e) => error!("Failed to load products: {}", e),
    }
    match state.orders.list_orders(&OrderFilter::default()).await {
        Ok(orders) => state.board.replace(orders).await,
        Err(e) => error!("Failed to load orders: {}", e),
    }
}
