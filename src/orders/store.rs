use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::orders::model::OrderRecord;

/// System of record for order status.
///
/// The webhook processor only needs to push a provider-reported status onto
/// an order; everything else about orders lives behind this trait.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Applies `new_status` to the order identified by the provider's id.
    async fn apply_transition(&self, external_order_id: &str, new_status: &str) -> Result<()>;

    /// Cheap reachability check used by readiness probes.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Order store kept in process memory.
///
/// Unknown orders are created on their first transition. Re-applying an
/// order's current status is a no-op, so redundant updates are harmless.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<String, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, external_order_id: &str) -> Option<OrderRecord> {
        self.orders.read().await.get(external_order_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn apply_transition(&self, external_order_id: &str, new_status: &str) -> Result<()> {
        let mut orders = self.orders.write().await;

        match orders.get_mut(external_order_id) {
            Some(order) => {
                let previous = order.status.clone();
                if order.transition_to(new_status) {
                    tracing::info!(
                        order_id = external_order_id,
                        from = %previous,
                        to = new_status,
                        "Order status updated"
                    );
                } else {
                    tracing::debug!(
                        order_id = external_order_id,
                        status = new_status,
                        "Order already in requested status"
                    );
                }
            }
            None => {
                orders.insert(
                    external_order_id.to_string(),
                    OrderRecord::new(external_order_id, new_status),
                );
                tracing::info!(
                    order_id = external_order_id,
                    status = new_status,
                    "Order first seen"
                );
            }
        }

        Ok(())
    }
}
