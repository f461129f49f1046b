use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, ShippingAddress};
use crate::payment::gateway::RemoteOrder;

/// One line of the purchase, as submitted by the client. Stored verbatim as
/// a snapshot; the catalog is not consulted.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product: Uuid,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub qty: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemInput>,
    pub shipping_address: ShippingAddress,
    pub total_price: Decimal,
}

/// Local order plus the processor-side descriptor the client needs to open
/// the payment widget.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub razorpay_order: RemoteOrder,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderOwner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Single-order view with the owner's name and email resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub user: OrderOwner,
}
