use serde::Deserialize;
use utoipa::IntoParams;

pub mod admin;
pub mod customers;
pub mod fabrics;
pub mod health;
pub mod products;
pub mod services;
pub mod session;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    /// Only return entries in this category.
    pub category: Option<String>,
}
