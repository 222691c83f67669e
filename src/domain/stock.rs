use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Units in stock per size label.
pub type SizeStock = BTreeMap<String, i32>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("Stock for {0} cannot be negative")]
    Negative(String),
    #[error("Unknown size {0}")]
    UnknownSize(String),
    #[error("A size is required for this product")]
    SizeRequired,
    #[error("This product is not sold in sizes")]
    NotSized,
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i32),
    #[error("Insufficient stock for {label}: {available} available, {requested} requested")]
    Insufficient {
        label: String,
        available: i32,
        requested: i32,
    },
    #[error("Malformed size stock: {0}")]
    Malformed(String),
    #[error("Total stock is too large")]
    Overflow,
    #[error("A sized product needs at least one size")]
    NoSizes,
}

/// Stock state of one product as stored in the `stock` and `size_stock` columns.
///
/// When `size_stock` is present, `stock` always equals the sum of its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    stock: i32,
    size_stock: Option<SizeStock>,
}

impl StockLevel {
    /// Build a level from the stored columns, deriving the total from sizes when they exist.
    pub fn from_columns(stock: i32, size_stock: Option<&Value>) -> Result<Self, StockError> {
        let size_stock = size_stock
            .filter(|value| !value.is_null())
            .map(|value| {
                serde_json::from_value::<SizeStock>(value.clone())
                    .map_err(|e| StockError::Malformed(e.to_string()))
            })
            .transpose()?;
        normalize(stock, size_stock)
    }

    pub fn stock(&self) -> i32 {
        self.stock
    }

    pub fn size_stock(&self) -> Option<&SizeStock> {
        self.size_stock.as_ref()
    }

    pub fn size_stock_value(&self) -> Option<Value> {
        self.size_stock
            .as_ref()
            .map(|sizes| serde_json::json!(sizes))
    }
}

pub fn total_stock(sizes: &SizeStock) -> Result<i32, StockError> {
    sizes
        .values()
        .try_fold(0i32, |total, count| total.checked_add(*count))
        .ok_or(StockError::Overflow)
}

/// Meters are kept to the centimetre.
pub fn round_centimetres(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

/// Meters left after cutting `requested` from `available`, or `None` when there is not enough.
pub fn remaining_meters(available: f64, requested: f64) -> Option<f64> {
    let available = round_centimetres(available);
    let requested = round_centimetres(requested);
    if available < requested {
        return None;
    }
    Some(round_centimetres(available - requested))
}

/// Validate a stock pair and derive the total from sizes when sizes are given.
pub fn normalize(stock: i32, size_stock: Option<SizeStock>) -> Result<StockLevel, StockError> {
    match size_stock {
        Some(sizes) => {
            if sizes.is_empty() {
                return Err(StockError::NoSizes);
            }
            if let Some((size, _)) = sizes.iter().find(|(_, count)| **count < 0) {
                return Err(StockError::Negative(format!("size {size}")));
            }
            Ok(StockLevel {
                stock: total_stock(&sizes)?,
                size_stock: Some(sizes),
            })
        }
        None if stock < 0 => Err(StockError::Negative("product".into())),
        None => Ok(StockLevel {
            stock,
            size_stock: None,
        }),
    }
}

/// Set the stock of one size, adding the size if it is new.
///
/// Setting a size on an unsized product turns it into a sized one.
pub fn set_size_stock(level: &mut StockLevel, size: &str, count: i32) -> Result<(), StockError> {
    if count < 0 {
        return Err(StockError::Negative(format!("size {size}")));
    }
    let mut sizes = level.size_stock.clone().unwrap_or_default();
    sizes.insert(size.to_string(), count);
    level.stock = total_stock(&sizes)?;
    level.size_stock = Some(sizes);
    Ok(())
}

/// Take `quantity` units out of stock.
pub fn decrement(level: &mut StockLevel, size: Option<&str>, quantity: i32) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::InvalidQuantity(quantity));
    }

    match (&mut level.size_stock, size) {
        (Some(sizes), Some(size)) => {
            let available = sizes
                .get_mut(size)
                .ok_or_else(|| StockError::UnknownSize(size.to_string()))?;
            if *available < quantity {
                return Err(StockError::Insufficient {
                    label: format!("size {size}"),
                    available: *available,
                    requested: quantity,
                });
            }
            *available -= quantity;
            level.stock = total_stock(sizes)?;
            Ok(())
        }
        (Some(_), None) => Err(StockError::SizeRequired),
        (None, Some(_)) => Err(StockError::NotSized),
        (None, None) => {
            if level.stock < quantity {
                return Err(StockError::Insufficient {
                    label: "product".into(),
                    available: level.stock,
                    requested: quantity,
                });
            }
            level.stock -= quantity;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sized(entries: &[(&str, i32)]) -> StockLevel {
        let sizes = entries
            .iter()
            .map(|(size, count)| ((*size).to_string(), *count))
            .collect();
        normalize(0, Some(sizes)).unwrap()
    }

    #[test]
    fn test_total_follows_sizes_on_load() {
        // Stored total is stale; sizes win
        let level = StockLevel::from_columns(99, Some(&json!({"S": 2, "M": 3}))).unwrap();
        assert_eq!(level.stock(), 5);
        assert_eq!(level.size_stock_value(), Some(json!({"M": 3, "S": 2})));
    }

    #[test]
    fn test_unsized_product_keeps_its_total() {
        let level = StockLevel::from_columns(7, None).unwrap();
        assert_eq!(level.stock(), 7);
        assert!(level.size_stock().is_none());

        let level = StockLevel::from_columns(7, Some(&Value::Null)).unwrap();
        assert!(level.size_stock().is_none());
    }

    #[test]
    fn test_malformed_size_stock() {
        let err = StockLevel::from_columns(0, Some(&json!(["S", "M"]))).unwrap_err();
        assert!(matches!(err, StockError::Malformed(_)));
    }

    #[test]
    fn test_set_size_stock_recomputes_total() {
        let mut level = sized(&[("S", 2), ("M", 3)]);

        set_size_stock(&mut level, "M", 10).unwrap();
        assert_eq!(level.stock(), 12);

        set_size_stock(&mut level, "XL", 1).unwrap();
        assert_eq!(level.stock(), 13);
        assert_eq!(level.stock(), total_stock(level.size_stock().unwrap()).unwrap());
    }

    #[test]
    fn test_set_size_stock_on_unsized_product() {
        let mut level = StockLevel::from_columns(5, None).unwrap();
        set_size_stock(&mut level, "L", 4).unwrap();
        assert_eq!(level.stock(), 4);
        assert_eq!(level.size_stock().unwrap().get("L"), Some(&4));
    }

    #[test]
    fn test_set_size_stock_rejects_negative() {
        let mut level = sized(&[("S", 2)]);
        assert_eq!(
            set_size_stock(&mut level, "S", -1),
            Err(StockError::Negative("size S".into()))
        );
        assert_eq!(level.stock(), 2);
    }

    #[test]
    fn test_decrement_sized() {
        let mut level = sized(&[("S", 2), ("M", 3)]);
        decrement(&mut level, Some("M"), 2).unwrap();
        assert_eq!(level.size_stock().unwrap().get("M"), Some(&1));
        assert_eq!(level.stock(), 3);
    }

    #[test]
    fn test_decrement_insufficient_leaves_stock_untouched() {
        let mut level = sized(&[("S", 2)]);
        let err = decrement(&mut level, Some("S"), 3).unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                label: "size S".into(),
                available: 2,
                requested: 3
            }
        );
        assert_eq!(level.stock(), 2);
    }

    #[test]
    fn test_decrement_size_mismatches() {
        let mut level = sized(&[("S", 2)]);
        assert_eq!(decrement(&mut level, None, 1), Err(StockError::SizeRequired));
        assert_eq!(
            decrement(&mut level, Some("XXL"), 1),
            Err(StockError::UnknownSize("XXL".into()))
        );

        let mut level = StockLevel::from_columns(4, None).unwrap();
        assert_eq!(decrement(&mut level, Some("S"), 1), Err(StockError::NotSized));
    }

    #[test]
    fn test_decrement_unsized() {
        let mut level = StockLevel::from_columns(4, None).unwrap();
        decrement(&mut level, None, 4).unwrap();
        assert_eq!(level.stock(), 0);
        assert!(matches!(
            decrement(&mut level, None, 1),
            Err(StockError::Insufficient { .. })
        ));
        assert_eq!(decrement(&mut level, None, 0), Err(StockError::InvalidQuantity(0)));
    }

    #[test]
    fn test_normalize_rejects_negative_values() {
        assert_eq!(normalize(-1, None), Err(StockError::Negative("product".into())));

        let mut sizes = SizeStock::new();
        sizes.insert("M".into(), -2);
        assert_eq!(
            normalize(0, Some(sizes)),
            Err(StockError::Negative("size M".into()))
        );
    }

    #[test]
    fn test_size_total_overflow_is_rejected() {
        let mut level = sized(&[("S", i32::MAX)]);
        assert_eq!(set_size_stock(&mut level, "M", 1), Err(StockError::Overflow));
        assert_eq!(level.stock(), i32::MAX);
        assert!(level.size_stock().unwrap().get("M").is_none());

        let mut sizes = SizeStock::new();
        sizes.insert("S".into(), i32::MAX);
        sizes.insert("M".into(), i32::MAX);
        assert_eq!(normalize(0, Some(sizes)), Err(StockError::Overflow));
    }

    #[test]
    fn test_empty_size_map_is_rejected() {
        assert_eq!(normalize(3, Some(SizeStock::new())), Err(StockError::NoSizes));
    }

    #[test]
    fn test_remaining_meters_does_not_drift() {
        let after_first = remaining_meters(3.3, 1.1).unwrap();
        let after_second = remaining_meters(after_first, 1.1).unwrap();
        assert_eq!(after_second, 1.1);
        assert_eq!(remaining_meters(after_second, 1.1), Some(0.0));
        assert_eq!(remaining_meters(0.5, 0.51), None);
    }
}
