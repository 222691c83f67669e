use anyhow::Context;
use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app_error::AppError;

/// Decode a JSONB document column.
pub fn from_document<T: DeserializeOwned>(value: &Value) -> Result<T, AppError> {
    Ok(serde_json::from_value(value.clone()).context("Stored document is malformed")?)
}

/// Encode a value for a JSONB document column.
pub fn to_document<T: Serialize>(value: &T) -> Result<Value, AppError> {
    Ok(serde_json::to_value(value).context("Failed to encode document")?)
}

// Products

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    /// Map of size label to units in stock, absent for unsized products.
    pub size_stock: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub stock: i32,
    pub size_stock: Option<Value>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::products)]
pub struct UpdateProductEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
    pub size_stock: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Fabrics

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::fabrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FabricEntity {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price_per_meter: f64,
    pub colors: Value,
    pub stock_meters: f64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::fabrics)]
pub struct CreateFabricEntity {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price_per_meter: f64,
    pub colors: Value,
    pub stock_meters: f64,
    pub image_url: Option<String>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::fabrics)]
pub struct UpdateFabricEntity {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_per_meter: Option<f64>,
    pub colors: Option<Value>,
    pub stock_meters: Option<f64>,
    pub image_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Tailoring services

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::tailoring_services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_price: f64,
    pub active: bool,
    pub customization_options: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::tailoring_services)]
pub struct CreateServiceEntity {
    pub name: String,
    pub description: Option<String>,
    pub base_price: f64,
    pub active: bool,
    pub customization_options: Value,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::tailoring_services)]
pub struct UpdateServiceEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<f64>,
    pub active: Option<bool>,
    pub customization_options: Option<Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

// Customers

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::customers)]
#[diesel(primary_key(uid))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomerEntity {
    pub uid: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub measurements: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::customers)]
pub struct CreateCustomerEntity {
    pub uid: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub measurements: Option<Value>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::customers)]
pub struct UpdateCustomerEntity {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub measurements: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub order_number: String,
    pub customer_uid: String,
    pub customer: Value,
    pub delivery_address: Value,
    pub service: Value,
    pub fabric: Option<Value>,
    pub customization: Value,
    pub measurements: Value,
    pub items: Value,
    pub pricing: Value,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub id: Uuid,
    pub order_number: String,
    pub customer_uid: String,
    pub customer: Value,
    pub delivery_address: Value,
    pub service: Value,
    pub fabric: Option<Value>,
    pub customization: Value,
    pub measurements: Value,
    pub items: Value,
    pub pricing: Value,
    pub status: String,
    pub notes: Option<String>,
}

// Outbox

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone)]
#[diesel(table_name = crate::schema::outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEntity {
    pub id: i32,
    pub event_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::outbox)]
pub struct CreateOutboxEntity {
    pub event_type: String,
    pub payload: String,
    pub status: String,
}
