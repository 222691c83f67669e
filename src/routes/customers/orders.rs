use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{
        checkout::{self, CheckoutReq, CustomizationOption, ProductLineReq},
        order_status::OrderStatus,
        pricing::{self, PricingInput},
        session::CustomerProfile,
    },
    events::{self, OrderPlacedEvent},
    inventory, middleware,
    models::{CreateOrderEntity, CustomerEntity, OrderEntity, ServiceEntity, from_document, to_document},
    outbox,
    schema::{customers, orders, tailoring_services},
};

/// Customer-facing order routes. Callers must have a customer profile.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(get_order))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::customers_authorization,
            )),
    )
}

/// Place an order. Prices come from the catalog; stock is taken in the same transaction.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = CheckoutReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Invalid checkout request"),
        (status = 409, description = "Not enough stock")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(customer): Extension<CustomerEntity>,
    Json(body): Json<CheckoutReq>,
) -> Result<impl IntoResponse, AppError> {
    checkout::validate(&body)?;
    let profile = CustomerProfile::from(customer);
    let parts = checkout::resolve_parts(&body, profile.defaults())?;
    let pricing_config = state.config.pricing.clone();
    let customer_uid = profile.uid;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let service: ServiceEntity = tailoring_services::table
                    .find(body.service_id)
                    .filter(tailoring_services::active.eq(true))
                    .get_result(conn)
                    .await
                    .optional()
                    .context("Failed to load service")?
                    .ok_or_else(|| {
                        AppError::BadRequest(format!("Unknown service {}", body.service_id))
                    })?;

                let options: Vec<CustomizationOption> =
                    from_document(&service.customization_options)?;
                let customization = checkout::resolve_customization(&options, &body.customization)?;

                let fabric = match &body.fabric {
                    Some(selection) => Some(inventory::take_fabric(conn, selection).await?),
                    None => None,
                };

                // Product rows are locked in id order
                let mut lines: Vec<&ProductLineReq> = body.items.iter().collect();
                lines.sort_by_key(|line| line.product_id);
                let mut items = Vec::with_capacity(lines.len());
                for line in lines {
                    items.push(inventory::take_product(conn, line).await?);
                }

                let price = pricing::quote(
                    &PricingInput {
                        service_price: service.base_price,
                        fabric_unit_price: fabric.as_ref().map_or(0.0, |f| f.unit_price),
                        fabric_quantity: fabric.as_ref().map_or(0.0, |f| f.quantity),
                        customization_surcharges: customization
                            .iter()
                            .map(|choice| choice.surcharge)
                            .collect(),
                        item_lines: items
                            .iter()
                            .map(|item| (item.unit_price, item.quantity))
                            .collect(),
                    },
                    &pricing_config,
                );

                let id = Uuid::new_v4();
                let measurements = to_document(&parts.measurements)?;
                let order = insert_order(
                    conn,
                    CreateOrderEntity {
                        id,
                        order_number: checkout::order_number(Utc::now(), id),
                        customer_uid: customer_uid.clone(),
                        customer: to_document(&parts.contact)?,
                        delivery_address: to_document(&parts.address)?,
                        service: to_document(&checkout::ServiceSnapshot {
                            id: service.id,
                            name: service.name,
                            base_price: service.base_price,
                        })?,
                        fabric: fabric.as_ref().map(to_document).transpose()?,
                        customization: to_document(&customization)?,
                        measurements: measurements.clone(),
                        items: to_document(&items)?,
                        pricing: to_document(&price)?,
                        status: OrderStatus::Pending.as_str().into(),
                        notes: body.notes.filter(|notes| !notes.trim().is_empty()),
                    },
                )
                .await?;

                diesel::update(customers::table.find(&customer_uid))
                    .set((
                        customers::measurements.eq(Some(measurements)),
                        customers::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)
                    .await
                    .context("Failed to save measurements to profile")?;

                outbox::publish(
                    conn,
                    events::ORDER_PLACED.into(),
                    OrderPlacedEvent {
                        order_id: order.id,
                        order_number: order.order_number.clone(),
                        customer_uid,
                        customer_email: parts.contact.email,
                        total: price.total,
                        placed_at: order.created_at,
                    },
                )
                .await?;

                Ok::<OrderEntity, AppError>(order)
            })
        })
        .await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        "Order placed"
    );

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Create order successfully"),
        },
    ))
}

const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// A unique violation on the order number column.
fn is_order_number_conflict(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name() == Some("orders_order_number_key")
    )
}

/// Insert an order, drawing a fresh id when its order number is already taken.
///
/// Each attempt runs in a savepoint so a collision does not abort the checkout transaction.
async fn insert_order(
    conn: &mut AsyncPgConnection,
    mut order: CreateOrderEntity,
) -> Result<OrderEntity, AppError> {
    let mut attempt = 1;
    loop {
        let values = order.clone();
        let inserted = conn
            .transaction(move |conn| {
                Box::pin(async move {
                    diesel::insert_into(orders::table)
                        .values(values)
                        .returning(OrderEntity::as_returning())
                        .get_result(conn)
                        .await
                })
            })
            .await;

        match inserted {
            Err(err) if is_order_number_conflict(&err) && attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!(order_number = %order.order_number, "Order number taken, retrying");
                attempt += 1;
                order.id = Uuid::new_v4();
                order.order_number = checkout::order_number(Utc::now(), order.id);
            }
            other => return Ok(other.context("Failed to create order")?),
        }
    }
}

/// Fetch the signed-in customer's orders, newest first.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderEntity>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(customer): Extension<CustomerEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::customer_uid.eq(&customer.uid))
        .order_by(orders::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my orders")?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch one of the signed-in customer's orders.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderEntity, String>),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(customer): Extension<CustomerEntity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    // Someone else's order is reported as missing
    let order: OrderEntity = orders::table
        .find(id)
        .filter(orders::customer_uid.eq(&customer.uid))
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}
