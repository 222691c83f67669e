//! Payloads written to the outbox and relayed to the message broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order_status::OrderStatus;

pub const ORDER_PLACED: &str = "orders.order_placed";
pub const ORDER_STATUS_CHANGED: &str = "orders.status_changed";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_uid: String,
    pub customer_email: String,
    pub total: f64,
    pub placed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_uid: String,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,
}
