use std::sync::Arc;
use tracing::instrument;

use crate::domain::{Order, OrderStatus};
use crate::ports::{OrderRepository, RepositoryError};
use crate::services::ServiceError;

/// Order creation, lookup and state-machine-driven status updates.
#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self { repository }
    }

    /// Validates and persists a new `Pending` order.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        product_name: &str,
        amount: i64,
        currency: &str,
    ) -> Result<Order, ServiceError> {
        let order = Order::new(product_name, amount, currency).map_err(ServiceError::Validation)?;

        self.repository
            .create(&order)
            .await
            .map_err(ServiceError::Persistence)?;

        tracing::info!(reference = %order.reference, "Created order");
        Ok(order)
    }

    pub async fn get_order_by_reference(&self, reference: &str) -> Result<Order, ServiceError> {
        self.repository
            .get_by_reference(reference)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => ServiceError::OrderNotFound(reference.to_string()),
                other => ServiceError::Persistence(other),
            })
    }

    /// Loads the order, applies `target` through the state machine and persists it.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        reference: &str,
        target: OrderStatus,
        psp_reference: &str,
    ) -> Result<Order, ServiceError> {
        let mut order = self.get_order_by_reference(reference).await?;

        order
            .transition_to(target, psp_reference)
            .map_err(ServiceError::InvalidTransition)?;

        self.persist_status(&order).await?;
        Ok(order)
    }

    /// Writes the order's current status and PSP reference.
    pub async fn persist_status(&self, order: &Order) -> Result<(), ServiceError> {
        self.repository
            .update_status(
                &order.reference,
                order.status,
                order.psp_reference.as_deref(),
            )
            .await
            .map_err(ServiceError::Persistence)
    }
}
