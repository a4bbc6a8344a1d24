use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Order, OrderStatus};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub reference: String,
    pub product_name: String,
    pub amount: i64,
    pub currency: String,
    pub formatted_amount: String,
    #[schema(value_type = String, example = "authorized")]
    pub status: OrderStatus,
    pub psp_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            formatted_amount: order.formatted_amount(),
            id: order.id,
            reference: order.reference,
            product_name: order.product_name,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            psp_reference: order.psp_reference,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/orders/{reference}",
    params(("reference" = String, Path, description = "Merchant order reference")),
    responses(
        (status = 200, description = "Order found", body = OrderView),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    let order = state
        .checkout
        .orders()
        .get_order_by_reference(&reference)
        .await?;

    Ok(Json(order.into()))
}
