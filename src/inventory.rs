//! Stock reads and writes against the database. Callers run these inside a transaction;
//! rows are locked with `FOR UPDATE` before they are changed.

use anyhow::Context;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::{
    app_error::AppError,
    domain::{
        checkout::{self, FabricColor, FabricSelectionReq, FabricSnapshot, ItemSnapshot, ProductLineReq},
        pricing::round_cents,
        stock::{self, StockLevel},
    },
    models::{FabricEntity, ProductEntity, from_document},
    schema::{fabrics, products},
};

/// Load and lock a product row.
pub async fn lock_product(conn: &mut AsyncPgConnection, id: Uuid) -> Result<ProductEntity, AppError> {
    let product = products::table
        .find(id)
        .for_update()
        .get_result(conn)
        .await?;
    Ok(product)
}

/// Persist a product's stock level, keeping `stock` equal to the sum of its sizes.
pub async fn save_stock_level(
    conn: &mut AsyncPgConnection,
    id: Uuid,
    level: &StockLevel,
) -> Result<ProductEntity, AppError> {
    let product = diesel::update(products::table.find(id))
        .set((
            products::stock.eq(level.stock()),
            products::size_stock.eq(level.size_stock_value()),
            products::updated_at.eq(diesel::dsl::now),
        ))
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update product stock")?;
    Ok(product)
}

/// Take one checkout line out of product stock.
pub async fn take_product(
    conn: &mut AsyncPgConnection,
    line: &ProductLineReq,
) -> Result<ItemSnapshot, AppError> {
    let product = match lock_product(conn, line.product_id).await {
        Err(AppError::NotFound) => {
            return Err(AppError::BadRequest(format!(
                "Unknown product {}",
                line.product_id
            )));
        }
        other => other?,
    };

    let mut level = StockLevel::from_columns(product.stock, product.size_stock.as_ref())?;
    stock::decrement(&mut level, line.size.as_deref(), line.quantity).map_err(|err| {
        tracing::info!(product_id = %product.id, error = %err, "Stock decrement rejected");
        AppError::from(err)
    })?;
    save_stock_level(conn, product.id, &level).await?;

    Ok(ItemSnapshot {
        product_id: product.id,
        name: product.name,
        size: line.size.clone(),
        quantity: line.quantity,
        unit_price: product.price,
        subtotal: round_cents(product.price * f64::from(line.quantity)),
    })
}

/// Take the selected meters of fabric out of stock.
pub async fn take_fabric(
    conn: &mut AsyncPgConnection,
    selection: &FabricSelectionReq,
) -> Result<FabricSnapshot, AppError> {
    let fabric: FabricEntity = fabrics::table
        .find(selection.fabric_id)
        .for_update()
        .get_result(conn)
        .await
        .optional()
        .context("Failed to load fabric")?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown fabric {}", selection.fabric_id)))?;

    let colors: Vec<FabricColor> = from_document(&fabric.colors)?;
    let color = checkout::find_color(&colors, &selection.color)?;

    let Some(remaining) = stock::remaining_meters(fabric.stock_meters, selection.quantity) else {
        return Err(AppError::Conflict(format!(
            "Only {:.2} m of {} left",
            fabric.stock_meters, fabric.name
        )));
    };

    diesel::update(fabrics::table.find(fabric.id))
        .set((
            fabrics::stock_meters.eq(remaining),
            fabrics::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to update fabric stock")?;

    Ok(FabricSnapshot {
        id: fabric.id,
        name: fabric.name.clone(),
        color: color.name.clone(),
        quantity: selection.quantity,
        unit_price: fabric.price_per_meter,
        subtotal: round_cents(fabric.price_per_meter * selection.quantity),
    })
}
