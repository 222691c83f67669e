//! HTTP tests against a running storefront.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run)
//! - An identity provider that accepts the tokens in `STOREFRONT_CUSTOMER_TOKEN`
//!   and `STOREFRONT_ADMIN_TOKEN`, the latter listed in `ADMIN_UIDS`
//!
//! Run with: cargo test --test http_api -- --ignored

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn token(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| panic!("{var} must be set"))
}

async fn json_body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("Failed to parse response body")
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("Resource has an id").to_string()
}

fn updated_at(order: &Value) -> DateTime<Utc> {
    order["updated_at"]
        .as_str()
        .expect("Order has updated_at")
        .parse()
        .expect("updated_at is RFC 3339")
}

/// Create a resource as the admin and return its `data`.
async fn admin_create(client: &Client, path: &str, body: Value) -> Value {
    let resp = client
        .post(format!("{}{path}", base_url()))
        .bearer_auth(token("STOREFRONT_ADMIN_TOKEN"))
        .json(&body)
        .send()
        .await
        .expect("Failed to create resource");
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await["data"].clone()
}

async fn get_data(client: &Client, path: &str) -> Value {
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to fetch resource");
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await["data"].clone()
}

/// A service, a fabric with 3.3 m and a shirt with sizes S=2, M=3.
async fn seed_catalog(client: &Client) -> (String, String, String) {
    let service = admin_create(
        client,
        "/admin/services",
        json!({
            "name": "Two-piece suit",
            "base_price": 180.0,
            "customization_options": [
                {"option": "lapel", "choices": [{"value": "peak", "surcharge": 25.0}]}
            ]
        }),
    )
    .await;
    let fabric = admin_create(
        client,
        "/admin/fabrics",
        json!({
            "name": "Super 120s wool",
            "category": "wool",
            "price_per_meter": 22.5,
            "colors": [{"name": "Charcoal", "hex": "#36454F"}],
            "stock_meters": 3.3
        }),
    )
    .await;
    let product = admin_create(
        client,
        "/admin/products",
        json!({
            "name": "Poplin shirt",
            "category": "shirts",
            "price": 35.0,
            "stock": 0,
            "size_stock": {"S": 2, "M": 3}
        }),
    )
    .await;
    (id_of(&service), id_of(&fabric), id_of(&product))
}

async fn save_customer_profile(client: &Client) {
    let resp = client
        .put(format!("{}/customers/me", base_url()))
        .bearer_auth(token("STOREFRONT_CUSTOMER_TOKEN"))
        .json(&json!({
            "full_name": "Ngozi Obi",
            "email": "ngozi@example.com",
            "address": {
                "line1": "4 Awolowo Road",
                "city": "Ikoyi",
                "postal_code": "106104",
                "country": "NG"
            },
            "measurements": {"unit": "cm", "values": {"chest": 102.0, "waist": 86.0}}
        }))
        .send()
        .await
        .expect("Failed to save profile");
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn place_order(client: &Client, body: &Value) -> reqwest::Response {
    client
        .post(format!("{}/customers/orders", base_url()))
        .bearer_auth(token("STOREFRONT_CUSTOMER_TOKEN"))
        .json(body)
        .send()
        .await
        .expect("Failed to place order")
}

async fn set_status(client: &Client, order_id: &str, status: &str) -> reqwest::Response {
    client
        .patch(format!("{}/admin/orders/{order_id}/status", base_url()))
        .bearer_auth(token("STOREFRONT_ADMIN_TOKEN"))
        .json(&json!({"status": status}))
        .send()
        .await
        .expect("Failed to update status")
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_health() {
    let resp = Client::new()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_anonymous_session() {
    let resp = Client::new()
        .get(format!("{}/session", base_url()))
        .send()
        .await
        .expect("Failed to get session");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["state"], "anonymous");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_admin_sized_product_lifecycle() {
    let client = Client::new();
    let base_url = base_url();
    let admin = token("STOREFRONT_ADMIN_TOKEN");

    let resp = client
        .post(format!("{base_url}/admin/products"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Linen shirt",
            "category": "shirts",
            "price": 45.0,
            "stock": 100,
            "size_stock": {"S": 2, "M": 3}
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product = json_body(resp).await["data"].clone();
    let id = product["id"].as_str().expect("Product has an id").to_string();
    assert_eq!(product["stock"], 5);

    let resp = client
        .put(format!("{base_url}/admin/products/{id}/sizes/L"))
        .bearer_auth(&admin)
        .json(&json!({"stock": 4}))
        .send()
        .await
        .expect("Failed to set size stock");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["stock"], 9);

    let resp = client
        .post(format!("{base_url}/admin/products/{id}/decrement"))
        .bearer_auth(&admin)
        .json(&json!({"size": "S", "quantity": 3}))
        .send()
        .await
        .expect("Failed to decrement stock");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .delete(format!("{base_url}/admin/products/{id}"))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to delete product");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_customer_cannot_use_admin_routes() {
    let resp = Client::new()
        .get(format!("{}/admin/orders", base_url()))
        .bearer_auth(token("STOREFRONT_CUSTOMER_TOKEN"))
        .send()
        .await
        .expect("Failed to list orders");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_order_status_rejects_unknown_status() {
    let resp = Client::new()
        .patch(format!(
            "{}/admin/orders/00000000-0000-4000-8000-000000000000/status",
            base_url()
        ))
        .bearer_auth(token("STOREFRONT_ADMIN_TOKEN"))
        .json(&json!({"status": "shipped"}))
        .send()
        .await
        .expect("Failed to update status");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_checkout_takes_stock_and_walks_status() {
    let client = Client::new();
    let (service_id, fabric_id, product_id) = seed_catalog(&client).await;
    save_customer_profile(&client).await;

    let resp = place_order(
        &client,
        &json!({
            "service_id": service_id,
            "fabric": {"fabric_id": fabric_id, "color": "charcoal", "quantity": 1.1},
            "customization": [{"option": "lapel", "value": "peak"}],
            "items": [{"product_id": product_id, "size": "M", "quantity": 2}]
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = json_body(resp).await["data"].clone();
    let order_id = id_of(&order);
    assert_eq!(order["status"], "pending");
    assert!(order["order_number"].as_str().expect("Order has a number").starts_with("TS-"));

    let product = get_data(&client, &format!("/products/{product_id}")).await;
    assert_eq!(product["stock"], 3);
    assert_eq!(product["size_stock"], json!({"S": 2, "M": 1}));
    let fabric = get_data(&client, &format!("/fabrics/{fabric_id}")).await;
    assert_eq!(fabric["stock_meters"], 2.2);

    let mut last_updated_at = updated_at(&order);
    for status in ["confirmed", "in_progress"] {
        let resp = set_status(&client, &order_id, status).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let order = json_body(resp).await["data"].clone();
        assert_eq!(order["status"], status);
        assert!(updated_at(&order) > last_updated_at);
        last_updated_at = updated_at(&order);
    }

    let resp = set_status(&client, &order_id, "confirmed").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .get(format!("{}/customers/orders/{order_id}", base_url()))
        .bearer_auth(token("STOREFRONT_CUSTOMER_TOKEN"))
        .send()
        .await
        .expect("Failed to fetch order");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["status"], "in_progress");
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_checkout_with_insufficient_stock_changes_nothing() {
    let client = Client::new();
    let (service_id, fabric_id, product_id) = seed_catalog(&client).await;
    save_customer_profile(&client).await;

    let resp = place_order(
        &client,
        &json!({
            "service_id": service_id,
            "fabric": {"fabric_id": fabric_id, "color": "Charcoal", "quantity": 1.0},
            "items": [{"product_id": product_id, "size": "S", "quantity": 3}]
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let product = get_data(&client, &format!("/products/{product_id}")).await;
    assert_eq!(product["stock"], 5);
    assert_eq!(product["size_stock"], json!({"S": 2, "M": 3}));
    let fabric = get_data(&client, &format!("/fabrics/{fabric_id}")).await;
    assert_eq!(fabric["stock_meters"], 3.3);
}

#[tokio::test]
#[ignore = "Requires running storefront server, database and identity provider"]
async fn test_fabric_cut_to_the_last_centimetre() {
    let client = Client::new();
    let (service_id, fabric_id, _) = seed_catalog(&client).await;
    save_customer_profile(&client).await;

    for _ in 0..3 {
        let resp = place_order(
            &client,
            &json!({
                "service_id": service_id,
                "fabric": {"fabric_id": fabric_id, "color": "Charcoal", "quantity": 1.1}
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let fabric = get_data(&client, &format!("/fabrics/{fabric_id}")).await;
    assert_eq!(fabric["stock_meters"], 0.0);
}
