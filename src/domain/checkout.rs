//! Checkout request documents, their validation and the snapshots stored on an order.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Measurement {0} must be a positive number")]
    InvalidMeasurement(String),
    #[error("Quantity for {0} must be positive")]
    InvalidQuantity(String),
    #[error("Customization option {0} was chosen more than once")]
    DuplicateOption(String),
    #[error("Unknown customization option {0}")]
    UnknownOption(String),
    #[error("Unknown choice {value} for customization option {option}")]
    UnknownChoice { option: String, value: String },
    #[error("Fabric is not available in color {0}")]
    UnknownColor(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerContact {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementUnit {
    #[default]
    Cm,
    In,
}

/// Body measurements keyed by name, e.g. `chest`, `waist`, `inseam`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Measurements {
    #[serde(default)]
    pub unit: MeasurementUnit,
    pub values: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomizationChoice {
    pub option: String,
    pub value: String,
}

/// One configurable option of a tailoring service, e.g. lapel style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomizationOption {
    pub option: String,
    pub choices: Vec<CustomizationValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomizationValue {
    pub value: String,
    #[serde(default)]
    pub surcharge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PricedCustomization {
    pub option: String,
    pub value: String,
    pub surcharge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FabricColor {
    pub name: String,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FabricSelectionReq {
    pub fabric_id: Uuid,
    pub color: String,
    /// Meters of fabric.
    pub quantity: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProductLineReq {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutReq {
    pub service_id: Uuid,
    pub fabric: Option<FabricSelectionReq>,
    #[serde(default)]
    pub customization: Vec<CustomizationChoice>,
    /// Falls back to the measurements saved on the customer profile.
    pub measurements: Option<Measurements>,
    /// Falls back to the address saved on the customer profile.
    pub delivery_address: Option<DeliveryAddress>,
    /// Falls back to the customer profile's name, email and phone.
    pub contact: Option<CustomerContact>,
    #[serde(default)]
    pub items: Vec<ProductLineReq>,
    pub notes: Option<String>,
}

/// What the customer profile can fill in when the request leaves it out.
#[derive(Debug, Clone)]
pub struct ProfileDefaults {
    pub contact: CustomerContact,
    pub address: Option<DeliveryAddress>,
    pub measurements: Option<Measurements>,
}

/// Contact, address and measurements after falling back to the profile.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderParts {
    pub contact: CustomerContact,
    pub address: DeliveryAddress,
    pub measurements: Measurements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServiceSnapshot {
    pub id: Uuid,
    pub name: String,
    pub base_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FabricSnapshot {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub size: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Check the quantities and choices of a checkout request before anything is loaded.
pub fn validate(req: &CheckoutReq) -> Result<(), CheckoutError> {
    if let Some(fabric) = &req.fabric {
        if !(fabric.quantity.is_finite() && fabric.quantity > 0.0) {
            return Err(CheckoutError::InvalidQuantity("fabric".into()));
        }
        if fabric.color.trim().is_empty() {
            return Err(CheckoutError::Missing("fabric color"));
        }
    }

    if let Some(item) = req.items.iter().find(|item| item.quantity <= 0) {
        return Err(CheckoutError::InvalidQuantity(format!(
            "product {}",
            item.product_id
        )));
    }

    let mut seen = HashSet::new();
    for choice in &req.customization {
        if !seen.insert(choice.option.as_str()) {
            return Err(CheckoutError::DuplicateOption(choice.option.clone()));
        }
    }

    Ok(())
}

/// Fill contact, address and measurements from the profile where the request has none,
/// then validate them.
pub fn resolve_parts(req: &CheckoutReq, defaults: ProfileDefaults) -> Result<OrderParts, CheckoutError> {
    let contact = req.contact.clone().unwrap_or(defaults.contact);
    let address = req
        .delivery_address
        .clone()
        .or(defaults.address)
        .ok_or(CheckoutError::Missing("delivery address"))?;
    let measurements = req
        .measurements
        .clone()
        .or(defaults.measurements)
        .ok_or(CheckoutError::Missing("measurements"))?;

    validate_contact(&contact)?;
    validate_address(&address)?;
    validate_measurements(&measurements)?;

    Ok(OrderParts {
        contact,
        address,
        measurements,
    })
}

pub fn validate_contact(contact: &CustomerContact) -> Result<(), CheckoutError> {
    if contact.full_name.trim().is_empty() {
        return Err(CheckoutError::Missing("full name"));
    }
    let email = contact.email.trim();
    if email.is_empty() {
        return Err(CheckoutError::Missing("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(CheckoutError::InvalidEmail(contact.email.clone())),
    }
}

pub fn validate_address(address: &DeliveryAddress) -> Result<(), CheckoutError> {
    let required = [
        ("address line", &address.line1),
        ("city", &address.city),
        ("postal code", &address.postal_code),
        ("country", &address.country),
    ];
    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(CheckoutError::Missing(*field)),
        None => Ok(()),
    }
}

pub fn validate_measurements(measurements: &Measurements) -> Result<(), CheckoutError> {
    if measurements.values.is_empty() {
        return Err(CheckoutError::Missing("measurements"));
    }
    match measurements
        .values
        .iter()
        .find(|(_, value)| !(value.is_finite() && **value > 0.0))
    {
        Some((name, _)) => Err(CheckoutError::InvalidMeasurement(name.clone())),
        None => Ok(()),
    }
}

/// Price each customization choice from the service's option table.
pub fn resolve_customization(
    options: &[CustomizationOption],
    choices: &[CustomizationChoice],
) -> Result<Vec<PricedCustomization>, CheckoutError> {
    choices
        .iter()
        .map(|choice| {
            let option = options
                .iter()
                .find(|option| option.option == choice.option)
                .ok_or_else(|| CheckoutError::UnknownOption(choice.option.clone()))?;
            let value = option
                .choices
                .iter()
                .find(|value| value.value == choice.value)
                .ok_or_else(|| CheckoutError::UnknownChoice {
                    option: choice.option.clone(),
                    value: choice.value.clone(),
                })?;
            Ok(PricedCustomization {
                option: option.option.clone(),
                value: value.value.clone(),
                surcharge: value.surcharge,
            })
        })
        .collect()
}

/// Match a requested color against a fabric's variants, ignoring case.
pub fn find_color<'a>(colors: &'a [FabricColor], requested: &str) -> Result<&'a FabricColor, CheckoutError> {
    colors
        .iter()
        .find(|color| color.name.eq_ignore_ascii_case(requested.trim()))
        .ok_or_else(|| CheckoutError::UnknownColor(requested.to_string()))
}

/// Human-readable order number, e.g. `TS-250601-3F2A9C10`.
pub fn order_number(now: DateTime<Utc>, id: Uuid) -> String {
    let suffix: String = id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("TS-{}-{}", now.format("%y%m%d"), suffix)
}
