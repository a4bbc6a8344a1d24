use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

/// The single item the storefront sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    /// Price in minor units.
    pub amount: i64,
    pub currency: String,
}

impl Product {
    pub fn premium_widget() -> Self {
        Self {
            name: "Premium Widget".to_string(),
            description: "A high-quality widget perfect for all your widget needs. \
                          Durable, reliable, and designed to last."
                .to_string(),
            price: "$1.00".to_string(),
            image_url: "/static/images/widget-placeholder.svg".to_string(),
            amount: 100,
            currency: "USD".to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/product",
    responses((status = 200, description = "Product on sale", body = Product)),
    tag = "Storefront"
)]
pub async fn get_product(State(state): State<AppState>) -> Json<Product> {
    Json(state.product)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premium_widget_serialization() {
        let json = serde_json::to_value(Product::premium_widget()).unwrap();

        assert_eq!(json["name"], "Premium Widget");
        assert_eq!(json["price"], "$1.00");
        assert_eq!(json["amount"], 100);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["imageUrl"], "/static/images/widget-placeholder.svg");
    }
}
