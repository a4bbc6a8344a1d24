//! In-memory implementation of OrderRepository.
//! Writes are serialized by a single lock, so status updates are atomic per order.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderRepository, RepositoryError, RepositoryResult};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> RepositoryResult<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.reference) {
            return Err(RepositoryError::Conflict(format!(
                "duplicate order reference {}",
                order.reference
            )));
        }
        orders.insert(order.reference.clone(), order.clone());
        Ok(())
    }

    async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Order> {
        self.orders
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))
    }

    async fn update_status(
        &self,
        reference: &str,
        status: OrderStatus,
        psp_reference: Option<&str>,
    ) -> RepositoryResult<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(reference)
            .ok_or_else(|| RepositoryError::NotFound(reference.to_string()))?;

        order.status = status;
        order.psp_reference = psp_reference
            .filter(|psp| !psp.is_empty())
            .map(str::to_string);
        order.updated_at = Utc::now();
        Ok(())
    }
}
