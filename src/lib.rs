pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod domain;
pub mod events;
pub mod inventory;
pub mod middleware;
pub mod models;
pub mod outbox;
pub mod routes;
pub mod schema;
pub mod swagger;

#[cfg(test)]
mod test_support;
