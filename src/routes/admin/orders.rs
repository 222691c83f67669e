use std::collections::BTreeMap;

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::order_status::{self, OrderStatus},
    events::{self, OrderStatusChangedEvent},
    middleware,
    models::OrderEntity,
    outbox,
    schema::orders,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(get_order_stats))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    /// Only return orders in this status.
    pub status: Option<String>,
}

/// Fetch all orders, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(StatusQuery),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderEntity>, String>),
        (status = 400, description = "Unknown status")
    )
)]
async fn get_orders(
    Query(query): Query<StatusQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut orders_query = orders::table
        .order_by(orders::created_at.desc())
        .into_boxed();
    if let Some(status) = status {
        orders_query = orders_query.filter(orders::status.eq(status.as_str()));
    }

    let orders: Vec<OrderEntity> = orders_query
        .get_results(conn)
        .await
        .context("Failed to get orders")?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

/// Fetch a specific order.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Admin"],
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
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: OrderEntity = orders::table.find(id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateOrderStatusReq {
    /// One of `pending`, `confirmed`, `in_progress`, `ready_for_delivery`,
    /// `delivered`, `cancelled`.
    pub status: String,
}

/// Move an order along its lifecycle.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Updated order status successfully", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let to: OrderStatus = body.status.trim().parse()?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let order: OrderEntity = orders::table
                    .find(id)
                    .for_update()
                    .get_result(conn)
                    .await?;

                let from: OrderStatus = order
                    .status
                    .parse()
                    .with_context(|| format!("Order {} has a malformed status", order.id))?;
                order_status::check_transition(from, to)?;

                let updated_at = order_status::advance_timestamp(order.updated_at, Utc::now());
                let order: OrderEntity = diesel::update(orders::table.find(id))
                    .set((
                        orders::status.eq(to.as_str()),
                        orders::updated_at.eq(updated_at),
                    ))
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update order status")?;

                outbox::publish(
                    conn,
                    events::ORDER_STATUS_CHANGED.into(),
                    OrderStatusChangedEvent {
                        order_id: order.id,
                        order_number: order.order_number.clone(),
                        customer_uid: order.customer_uid.clone(),
                        from,
                        to,
                        changed_at: order.updated_at,
                    },
                )
                .await?;

                tracing::info!(
                    order_id = %order.id,
                    from = %from,
                    to = %to,
                    "Order status changed"
                );

                Ok::<OrderEntity, AppError>(order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Update order status successfully"),
    })
}

#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct OrderStats {
    pub total: i64,
    /// Count per status; every known status is present, even at zero.
    pub by_status: BTreeMap<String, i64>,
}

fn summarize(counts: Vec<(String, i64)>) -> OrderStats {
    let mut by_status: BTreeMap<String, i64> = OrderStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    for (status, count) in counts {
        *by_status.entry(status).or_default() += count;
    }

    OrderStats {
        total: by_status.values().sum(),
        by_status,
    }
}

/// Count orders per status for the admin dashboard.
#[utoipa::path(
    get,
    path = "/stats",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get order stats successfully", body = StdResponse<OrderStats, String>)
    )
)]
async fn get_order_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let counts: Vec<(String, i64)> = orders::table
        .group_by(orders::status)
        .select((orders::status, diesel::dsl::count_star()))
        .load(conn)
        .await
        .context("Failed to count orders")?;

    Ok(StdResponse {
        data: Some(summarize(counts)),
        message: Some("Get order stats successfully"),
    })
}
