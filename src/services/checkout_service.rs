use std::sync::Arc;
use tracing::instrument;

use crate::domain::{split_inclusive, Order, OrderStatus};
use crate::ports::{LineItem, PaymentGateway, SessionRequest};
use crate::services::{OrderService, ServiceError};

/// Default tax rate applied to the single line item: 1000 bps = 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Catalog id sent with the line item.
pub const PRODUCT_ID: &str = "widget-001";

/// Input for starting a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub product_name: String,
    pub amount: i64,
    pub currency: String,
    pub return_url: String,
}

/// A live payment session bound to a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    pub session_id: String,
    pub session_data: String,
    pub client_key: String,
    pub order_reference: String,
}

/// Result of applying a session outcome to its order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentVerification {
    pub order: Order,
    pub result_code: String,
    pub psp_reference: String,
    pub status: OrderStatus,
}

/// Maps a gateway result code onto an order status.
///
/// Unknown codes, including the empty string, map to `Pending`.
pub fn map_result_code(result_code: &str) -> OrderStatus {
    match result_code {
        "Authorised" => OrderStatus::Authorized,
        "Refused" | "Error" => OrderStatus::Failed,
        "Cancelled" => OrderStatus::Cancelled,
        _ => OrderStatus::Pending,
    }
}

/// Creates orders together with hosted payment sessions and reconciles their outcomes.
#[derive(Clone)]
pub struct CheckoutService {
    orders: OrderService,
    gateway: Arc<dyn PaymentGateway>,
    client_key: String,
    tax_rate_bps: u32,
}

impl CheckoutService {
    pub fn new(orders: OrderService, gateway: Arc<dyn PaymentGateway>, client_key: String) -> Self {
        Self {
            orders,
            gateway,
            client_key,
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate_bps: u32) -> Self {
        self.tax_rate_bps = tax_rate_bps;
        self
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    /// Persists a `Pending` order, then opens a gateway session for it.
    ///
    /// A gateway failure leaves the persisted order in place; it stays `Pending`.
    #[instrument(skip(self, request), fields(product = %request.product_name, amount = request.amount))]
    pub async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<PaymentSession, ServiceError> {
        let order = self
            .orders
            .create_order(&request.product_name, request.amount, &request.currency)
            .await?;

        let session_request = SessionRequest {
            reference: order.reference.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            return_url: request.return_url,
            line_items: vec![self.line_item(&order)],
        };

        let session = self
            .gateway
            .create_session(&session_request)
            .await
            .map_err(|e| {
                tracing::error!(reference = %order.reference, error = %e, "Failed to create payment session");
                ServiceError::Gateway(e)
            })?;

        tracing::info!(
            session_id = %session.id,
            reference = %order.reference,
            "Payment session created"
        );

        Ok(PaymentSession {
            session_id: session.id,
            session_data: session.session_data,
            client_key: self.client_key.clone(),
            order_reference: order.reference,
        })
    }

    /// Fetches the session outcome and applies it to the matching order.
    ///
    /// Safe to call repeatedly for the same outcome. A failed status write is
    /// logged and the in-memory result is still returned.
    #[instrument(skip(self, session_result))]
    pub async fn reconcile_payment(
        &self,
        session_id: &str,
        session_result: &str,
    ) -> Result<PaymentVerification, ServiceError> {
        let outcome = self
            .gateway
            .get_session_outcome(session_id, session_result)
            .await
            .map_err(ServiceError::Gateway)?;

        let attempt = outcome.first_attempt();
        let status = map_result_code(&attempt.result_code);

        tracing::info!(
            result_code = %attempt.result_code,
            reference = %outcome.reference,
            psp_reference = %attempt.psp_reference,
            mapped_status = %status,
            "Session outcome retrieved"
        );

        let mut order = self.orders.get_order_by_reference(&outcome.reference).await?;

        if status == OrderStatus::Pending {
            tracing::info!(
                reference = %order.reference,
                result_code = %attempt.result_code,
                "Outcome not final, leaving order untouched"
            );
        } else {
            self.apply_outcome(&mut order, status, &attempt.psp_reference)
                .await;
        }

        Ok(PaymentVerification {
            order,
            result_code: attempt.result_code,
            psp_reference: attempt.psp_reference,
            status,
        })
    }

    async fn apply_outcome(&self, order: &mut Order, status: OrderStatus, psp_reference: &str) {
        let mut candidate = order.clone();
        if let Err(e) = candidate.transition_to(status, psp_reference) {
            tracing::warn!(
                reference = %order.reference,
                current = %order.status,
                mapped_status = %status,
                error = %e,
                "Outcome rejected by order state machine"
            );
            return;
        }

        *order = candidate;

        if let Err(e) = self.orders.persist_status(order).await {
            tracing::warn!(
                reference = %order.reference,
                status = %order.status,
                error = %e,
                "Failed to persist order status"
            );
        }
    }

    fn line_item(&self, order: &Order) -> LineItem {
        let split = split_inclusive(order.amount, self.tax_rate_bps);
        LineItem {
            quantity: 1,
            amount_excluding_tax: split.amount_excluding_tax,
            tax_percentage: i64::from(self.tax_rate_bps),
            description: order.product_name.clone(),
            id: PRODUCT_ID.to_string(),
            tax_amount: split.tax_amount,
            amount_including_tax: split.amount_including_tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryOrderRepository;
    use crate::domain::OrderError;
    use crate::ports::{
        CheckoutSession, GatewayError, GatewayResult, OrderRepository, PaymentAttempt,
        RepositoryError, RepositoryResult, SessionOutcome,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted gateway: records session requests and replays a configured outcome.
    #[derive(Default)]
    struct StubGateway {
        requests: Mutex<Vec<SessionRequest>>,
        outcome: Mutex<Option<(String, String)>>,
        fail_create: bool,
        fail_outcome: bool,
    }

    impl StubGateway {
        fn set_outcome(&self, result_code: &str, psp_reference: &str) {
            *self.outcome.lock().unwrap() =
                Some((result_code.to_string(), psp_reference.to_string()));
        }

        fn last_request(&self) -> SessionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_session(&self, request: &SessionRequest) -> GatewayResult<CheckoutSession> {
            if self.fail_create {
                return Err(GatewayError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.requests.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                id: format!("CS-{}", request.reference),
                session_data: "session-blob".to_string(),
            })
        }

        async fn get_session_outcome(
            &self,
            session_id: &str,
            _session_result: &str,
        ) -> GatewayResult<SessionOutcome> {
            if self.fail_outcome {
                return Err(GatewayError::Request("connection refused".to_string()));
            }
            let reference = session_id.trim_start_matches("CS-").to_string();
            let payments = self
                .outcome
                .lock()
                .unwrap()
                .clone()
                .map(|(result_code, psp_reference)| {
                    vec![PaymentAttempt {
                        result_code,
                        psp_reference,
                    }]
                })
                .unwrap_or_default();
            Ok(SessionOutcome {
                session_id: session_id.to_string(),
                reference,
                status: "completed".to_string(),
                payments,
            })
        }
    }

    /// Repository whose status writes always fail.
    struct FailingUpdates(InMemoryOrderRepository);

    #[async_trait]
    impl OrderRepository for FailingUpdates {
        async fn create(&self, order: &Order) -> RepositoryResult<()> {
            self.0.create(order).await
        }

        async fn get_by_reference(&self, reference: &str) -> RepositoryResult<Order> {
            self.0.get_by_reference(reference).await
        }

        async fn update_status(
            &self,
            _reference: &str,
            _status: OrderStatus,
            _psp_reference: Option<&str>,
        ) -> RepositoryResult<()> {
            Err(RepositoryError::Database("connection reset".to_string()))
        }
    }

    fn checkout_with(
        repo: Arc<dyn OrderRepository>,
        gateway: Arc<StubGateway>,
    ) -> CheckoutService {
        CheckoutService::new(OrderService::new(repo), gateway, "client-key".to_string())
    }

    fn widget_request() -> CheckoutRequest {
        CheckoutRequest {
            product_name: "Widget".to_string(),
            amount: 100,
            currency: "USD".to_string(),
            return_url: "http://localhost:8080/order/confirmation".to_string(),
        }
    }

    #[test]
    fn test_result_code_mapping() {
        assert_eq!(map_result_code("Authorised"), OrderStatus::Authorized);
        assert_eq!(map_result_code("Refused"), OrderStatus::Failed);
        assert_eq!(map_result_code("Error"), OrderStatus::Failed);
        assert_eq!(map_result_code("Cancelled"), OrderStatus::Cancelled);
        assert_eq!(map_result_code(""), OrderStatus::Pending);
        assert_eq!(map_result_code("Pending"), OrderStatus::Pending);
        assert_eq!(map_result_code("authorised"), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_checkout_persists_order_and_sends_line_item() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());

        let session = service.create_checkout(widget_request()).await.unwrap();

        assert_eq!(session.session_id, format!("CS-{}", session.order_reference));
        assert_eq!(session.session_data, "session-blob");
        assert_eq!(session.client_key, "client-key");

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);

        let request = gateway.last_request();
        assert_eq!(request.reference, session.order_reference);
        assert_eq!(request.amount, 100);
        assert_eq!(request.currency, "USD");
        assert_eq!(
            request.line_items,
            vec![LineItem {
                quantity: 1,
                amount_excluding_tax: 90,
                tax_percentage: 1000,
                description: "Widget".to_string(),
                id: PRODUCT_ID.to_string(),
                tax_amount: 10,
                amount_including_tax: 100,
            }]
        );
    }

    #[tokio::test]
    async fn test_create_checkout_uses_configured_tax_rate() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo, gateway.clone()).with_tax_rate(2000);

        let mut request = widget_request();
        request.amount = 120;
        service.create_checkout(request).await.unwrap();

        let item = &gateway.last_request().line_items[0];
        assert_eq!(item.amount_excluding_tax, 100);
        assert_eq!(item.tax_amount, 20);
        assert_eq!(item.tax_percentage, 2000);
    }

    #[tokio::test]
    async fn test_create_checkout_rejects_invalid_input_without_side_effects() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());

        let mut request = widget_request();
        request.currency = "US".to_string();
        let err = service.create_checkout(request).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Validation(OrderError::InvalidCurrency(_))
        ));
        assert!(repo.is_empty().await);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_pending_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway {
            fail_create: true,
            ..Default::default()
        });
        let service = checkout_with(repo.clone(), gateway);

        let err = service.create_checkout(widget_request()).await.unwrap_err();

        assert!(matches!(err, ServiceError::Gateway(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_reconcile_authorised() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Authorised", "PSP-9");
        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Authorized);
        assert_eq!(result.result_code, "Authorised");
        assert_eq!(result.psp_reference, "PSP-9");
        assert_eq!(result.order.status, OrderStatus::Authorized);
        assert_eq!(result.order.psp_reference.as_deref(), Some("PSP-9"));

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Authorized);
        assert_eq!(stored.psp_reference.as_deref(), Some("PSP-9"));
    }

    #[tokio::test]
    async fn test_reconcile_refused_twice_is_idempotent() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Refused", "");
        for _ in 0..2 {
            let result = service
                .reconcile_payment(&session.session_id, "result")
                .await
                .unwrap();
            assert_eq!(result.status, OrderStatus::Failed);
            assert_eq!(result.order.status, OrderStatus::Failed);
        }

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_reconcile_repeated_authorisation_keeps_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Authorised", "PSP-9");
        service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();
        let again = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(again.status, OrderStatus::Authorized);
        assert_eq!(again.order.status, OrderStatus::Authorized);
        assert_eq!(again.order.psp_reference.as_deref(), Some("PSP-9"));
    }

    #[tokio::test]
    async fn test_reconcile_never_downgrades_authorized_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Authorised", "PSP-9");
        service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        gateway.set_outcome("Refused", "");
        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Failed);
        assert_eq!(result.order.status, OrderStatus::Authorized);

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Authorized);
        assert_eq!(stored.psp_reference.as_deref(), Some("PSP-9"));
    }

    #[tokio::test]
    async fn test_reconcile_unknown_code_reports_pending() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();
        let before = repo.get_by_reference(&session.order_reference).await.unwrap();

        gateway.set_outcome("RedirectShopper", "");
        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Pending);
        assert_eq!(result.result_code, "RedirectShopper");
        assert_eq!(result.order, before);

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored, before);
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.psp_reference.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_cancelled() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Cancelled", "");
        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Cancelled);
        assert_eq!(result.result_code, "Cancelled");
        assert!(result.order.is_cancelled());

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert!(stored.psp_reference.is_none());
    }

    #[tokio::test]
    async fn test_create_checkout_with_maximum_tax_rate() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo, gateway.clone()).with_tax_rate(u32::MAX);

        service.create_checkout(widget_request()).await.unwrap();

        let item = &gateway.last_request().line_items[0];
        assert_eq!(item.amount_excluding_tax, 0);
        assert_eq!(item.tax_amount, 100);
        assert_eq!(item.tax_percentage, i64::from(u32::MAX));
    }

    #[tokio::test]
    async fn test_reconcile_without_payments_reports_empty_code() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.result_code, "");
        assert_eq!(result.psp_reference, "");
        assert_eq!(result.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_order() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo, gateway.clone());

        gateway.set_outcome("Authorised", "PSP-9");
        let err = service
            .reconcile_payment("CS-ORDER-missing", "result")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::OrderNotFound(r) if r == "ORDER-missing"));
    }

    #[tokio::test]
    async fn test_reconcile_gateway_failure_is_surfaced() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let gateway = Arc::new(StubGateway {
            fail_outcome: true,
            ..Default::default()
        });
        let service = checkout_with(repo, gateway);

        let err = service.reconcile_payment("CS-1", "result").await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_reconcile_swallows_persistence_failure() {
        let repo = Arc::new(FailingUpdates(InMemoryOrderRepository::new()));
        let gateway = Arc::new(StubGateway::default());
        let service = checkout_with(repo.clone(), gateway.clone());
        let session = service.create_checkout(widget_request()).await.unwrap();

        gateway.set_outcome("Authorised", "PSP-9");
        let result = service
            .reconcile_payment(&session.session_id, "result")
            .await
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::Authorized);
        assert_eq!(result.order.psp_reference.as_deref(), Some("PSP-9"));

        let stored = repo.get_by_reference(&session.order_reference).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }
}
