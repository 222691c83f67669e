//! Pure order, stock and session rules. Nothing in here touches the database.

pub mod checkout;
pub mod order_status;
pub mod pricing;
pub mod session;
pub mod stock;
