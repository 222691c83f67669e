use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub delivery_fee: f64,
    /// Merchandise subtotal at or above which delivery is free.
    pub free_delivery_threshold: f64,
}

/// Server-side prices of everything in a checkout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingInput {
    pub service_price: f64,
    pub fabric_unit_price: f64,
    pub fabric_quantity: f64,
    pub customization_surcharges: Vec<f64>,
    /// `(unit price, quantity)` for each ready-made product line.
    pub item_lines: Vec<(f64, i32)>,
}

/// Pricing stored on every order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceBreakdown {
    pub service: f64,
    pub fabric: f64,
    pub customization: f64,
    pub items: f64,
    pub delivery: f64,
    pub total: f64,
}

impl PriceBreakdown {
    pub fn merchandise(&self) -> f64 {
        round_cents(self.service + self.fabric + self.customization + self.items)
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn quote(input: &PricingInput, config: &PricingConfig) -> PriceBreakdown {
    let service = round_cents(input.service_price);
    let fabric = round_cents(input.fabric_unit_price * input.fabric_quantity);
    let customization = round_cents(input.customization_surcharges.iter().sum());
    let items = round_cents(
        input
            .item_lines
            .iter()
            .map(|(unit_price, quantity)| unit_price * f64::from(*quantity))
            .sum(),
    );

    let merchandise = round_cents(service + fabric + customization + items);
    let delivery = if merchandise >= config.free_delivery_threshold {
        0.0
    } else {
        round_cents(config.delivery_fee)
    };

    PriceBreakdown {
        service,
        fabric,
        customization,
        items,
        delivery,
        total: round_cents(merchandise + delivery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PricingConfig {
        PricingConfig {
            delivery_fee: 15.0,
            free_delivery_threshold: 250.0,
        }
    }

    #[test]
    fn test_quote_sums_all_parts() {
        let input = PricingInput {
            service_price: 120.0,
            fabric_unit_price: 24.5,
            fabric_quantity: 2.5,
            customization_surcharges: vec![10.0, 5.25],
            item_lines: vec![(19.99, 2)],
        };

        let quote = quote(&input, &config());
        assert_eq!(quote.service, 120.0);
        assert_eq!(quote.fabric, 61.25);
        assert_eq!(quote.customization, 15.25);
        assert_eq!(quote.items, 39.98);
        assert_eq!(quote.merchandise(), 236.48);
        assert_eq!(quote.delivery, 15.0);
        assert_eq!(quote.total, 251.48);
    }

    #[test]
    fn test_delivery_waived_at_threshold() {
        let input = PricingInput {
            service_price: 250.0,
            ..Default::default()
        };

        let quote = quote(&input, &config());
        assert_eq!(quote.delivery, 0.0);
        assert_eq!(quote.total, 250.0);
    }

    #[test]
    fn test_rounds_to_cents() {
        let input = PricingInput {
            fabric_unit_price: 10.0 / 3.0,
            fabric_quantity: 1.0,
            ..Default::default()
        };

        let quote = quote(&input, &config());
        assert_eq!(quote.fabric, 3.33);
        assert_eq!(quote.total, 18.33);
    }
}
