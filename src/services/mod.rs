pub mod checkout_service;
pub mod order_service;

pub use checkout_service::{
    map_result_code, CheckoutRequest, CheckoutService, PaymentSession, PaymentVerification,
};
pub use order_service::OrderService;

use thiserror::Error;

use crate::domain::OrderError;
use crate::ports::{GatewayError, RepositoryError};

/// Errors surfaced by the order services to their callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid order: {0}")]
    Validation(OrderError),

    #[error("{0}")]
    InvalidTransition(OrderError),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("persistence error: {0}")]
    Persistence(RepositoryError),

    #[error("payment gateway error: {0}")]
    Gateway(GatewayError),
}
