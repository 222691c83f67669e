use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::stock::{self, SizeStock, StockLevel},
    inventory, middleware,
    models::{CreateProductEntity, ProductEntity, UpdateProductEntity},
    schema::products,
};

use super::{require_amount, require_text};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(update_product, delete_product))
            .routes(utoipa_axum::routes!(set_size_stock))
            .routes(utoipa_axum::routes!(decrement_stock))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateProductReq {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: f64,
    pub image_url: Option<String>,
    /// Ignored when `size_stock` is given; the total is derived from the sizes.
    #[serde(default)]
    pub stock: i32,
    #[schema(value_type = Option<Object>)]
    pub size_stock: Option<SizeStock>,
}

/// Add a product to the catalog.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    request_body = CreateProductReq,
    responses(
        (status = 201, description = "Created product successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Invalid product")
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    require_text("name", &body.name)?;
    require_text("category", &body.category)?;
    require_amount("price", body.price)?;
    let level = stock::normalize(body.stock, body.size_stock)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            name: body.name,
            description: body.description,
            category: body.category,
            price: body.price,
            image_url: body.image_url,
            stock: level.stock(),
            size_stock: level.size_stock_value(),
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    tracing::info!(product_id = %product.id, "Created product");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(product),
            message: Some("Create product successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct UpdateProductReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    /// Only for products without sizes.
    pub stock: Option<i32>,
    /// Replaces every size; the total is derived from it.
    #[schema(value_type = Option<Object>)]
    pub size_stock: Option<SizeStock>,
}

/// Work out the stock columns an update writes, if it touches stock at all.
fn updated_stock_level(
    current: &StockLevel,
    stock: Option<i32>,
    size_stock: Option<SizeStock>,
) -> Result<Option<StockLevel>, AppError> {
    match (stock, size_stock) {
        (_, Some(sizes)) => Ok(Some(stock::normalize(0, Some(sizes))?)),
        (Some(_), None) if current.size_stock().is_some() => Err(AppError::BadRequest(
            "Stock of a sized product is set per size".into(),
        )),
        (Some(stock), None) => Ok(Some(stock::normalize(stock, None)?)),
        (None, None) => Ok(None),
    }
}

/// Update a product. Omitted fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductReq,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found")
    )
)]
async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(name) = &body.name {
        require_text("name", name)?;
    }
    if let Some(category) = &body.category {
        require_text("category", category)?;
    }
    if let Some(price) = body.price {
        require_amount("price", price)?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product = inventory::lock_product(conn, id).await?;
                let current = StockLevel::from_columns(product.stock, product.size_stock.as_ref())?;
                let level = updated_stock_level(&current, body.stock, body.size_stock)?;

                let product = diesel::update(products::table.find(id))
                    .set(UpdateProductEntity {
                        name: body.name,
                        description: body.description,
                        category: body.category,
                        price: body.price,
                        image_url: body.image_url,
                        stock: level.as_ref().map(StockLevel::stock),
                        size_stock: level.as_ref().and_then(StockLevel::size_stock_value),
                        updated_at: Some(Utc::now()),
                    })
                    .returning(ProductEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update product")?;

                Ok::<ProductEntity, AppError>(product)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Update product successfully"),
    })
}

/// Remove a product from the catalog. Placed orders keep their own snapshot.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted product successfully", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found")
    )
)]
async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::delete(products::table.find(id))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(product_id = %product.id, "Deleted product");

    Ok(StdResponse {
        data: Some(product),
        message: Some("Delete product successfully"),
    })
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct SetSizeStockReq {
    pub stock: i32,
}

/// Set the stock of one size, adding the size if it is new.
#[utoipa::path(
    put,
    path = "/{id}/sizes/{size}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("size" = String, Path, description = "Size label, e.g. M or 42")
    ),
    request_body = SetSizeStockReq,
    responses(
        (status = 200, description = "Updated size stock successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Negative stock"),
        (status = 404, description = "Product not found")
    )
)]
async fn set_size_stock(
    Path((id, size)): Path<(Uuid, String)>,
    State(state): State<AppState>,
    Json(body): Json<SetSizeStockReq>,
) -> Result<impl IntoResponse, AppError> {
    require_text("size", &size)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product = inventory::lock_product(conn, id).await?;
                let mut level =
                    StockLevel::from_columns(product.stock, product.size_stock.as_ref())?;
                stock::set_size_stock(&mut level, size.trim(), body.stock)?;
                inventory::save_stock_level(conn, id, &level).await
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Update size stock successfully"),
    })
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct DecrementStockReq {
    /// Required for sized products, rejected for the rest.
    pub size: Option<String>,
    pub quantity: i32,
}

/// Take units out of stock, e.g. for an offline sale.
#[utoipa::path(
    post,
    path = "/{id}/decrement",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = DecrementStockReq,
    responses(
        (status = 200, description = "Decremented stock successfully", body = StdResponse<ProductEntity, String>),
        (status = 400, description = "Unknown size or invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Not enough stock")
    )
)]
async fn decrement_stock(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<DecrementStockReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let product = inventory::lock_product(conn, id).await?;
                let mut level =
                    StockLevel::from_columns(product.stock, product.size_stock.as_ref())?;
                stock::decrement(&mut level, body.size.as_deref(), body.quantity)?;
                inventory::save_stock_level(conn, id, &level).await
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Decrement stock successfully"),
    })
}
