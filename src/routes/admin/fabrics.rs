use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{checkout::FabricColor, stock::round_centimetres},
    middleware,
    models::{CreateFabricEntity, FabricEntity, UpdateFabricEntity, to_document},
    schema::fabrics,
};

use super::{require_amount, require_text};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/fabrics",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_fabric))
            .routes(utoipa_axum::routes!(update_fabric, delete_fabric))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

fn validate_colors(colors: &[FabricColor]) -> Result<(), AppError> {
    if colors.is_empty() {
        return Err(AppError::BadRequest("At least one color is required".into()));
    }
    for (i, color) in colors.iter().enumerate() {
        require_text("color name", &color.name)?;
        if colors[..i]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&color.name))
        {
            return Err(AppError::BadRequest(format!(
                "Color {} is listed twice",
                color.name
            )));
        }
    }
    Ok(())
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateFabricReq {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price_per_meter: f64,
    pub colors: Vec<FabricColor>,
    #[serde(default)]
    pub stock_meters: f64,
    pub image_url: Option<String>,
}

/// Add a fabric to the catalog.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    request_body = CreateFabricReq,
    responses(
        (status = 201, description = "Created fabric successfully", body = StdResponse<FabricEntity, String>),
        (status = 400, description = "Invalid fabric")
    )
)]
async fn create_fabric(
    State(state): State<AppState>,
    Json(body): Json<CreateFabricReq>,
) -> Result<impl IntoResponse, AppError> {
    require_text("name", &body.name)?;
    require_text("category", &body.category)?;
    require_amount("price_per_meter", body.price_per_meter)?;
    require_amount("stock_meters", body.stock_meters)?;
    validate_colors(&body.colors)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let fabric = diesel::insert_into(fabrics::table)
        .values(CreateFabricEntity {
            name: body.name,
            category: body.category,
            description: body.description,
            price_per_meter: body.price_per_meter,
            colors: to_document(&body.colors)?,
            stock_meters: round_centimetres(body.stock_meters),
            image_url: body.image_url,
        })
        .returning(FabricEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create fabric")?;

    tracing::info!(fabric_id = %fabric.id, "Created fabric");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(fabric),
            message: Some("Create fabric successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateFabricReq {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price_per_meter: Option<f64>,
    /// Replaces the whole color list.
    pub colors: Option<Vec<FabricColor>>,
    pub stock_meters: Option<f64>,
    pub image_url: Option<String>,
}

/// Update a fabric. Omitted fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Fabric ID to update")
    ),
    request_body = UpdateFabricReq,
    responses(
        (status = 200, description = "Updated fabric successfully", body = StdResponse<FabricEntity, String>),
        (status = 404, description = "Fabric not found")
    )
)]
async fn update_fabric(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateFabricReq>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(name) = &body.name {
        require_text("name", name)?;
    }
    if let Some(category) = &body.category {
        require_text("category", category)?;
    }
    if let Some(price) = body.price_per_meter {
        require_amount("price_per_meter", price)?;
    }
    if let Some(stock_meters) = body.stock_meters {
        require_amount("stock_meters", stock_meters)?;
    }
    let colors = match &body.colors {
        Some(colors) => {
            validate_colors(colors)?;
            Some(to_document(colors)?)
        }
        None => None,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let fabric: FabricEntity = diesel::update(fabrics::table.find(id))
        .set(UpdateFabricEntity {
            name: body.name,
            category: body.category,
            description: body.description,
            price_per_meter: body.price_per_meter,
            colors,
            stock_meters: body.stock_meters.map(round_centimetres),
            image_url: body.image_url,
            updated_at: Some(Utc::now()),
        })
        .returning(FabricEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(fabric),
        message: Some("Update fabric successfully"),
    })
}

/// Remove a fabric from the catalog.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Fabric ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted fabric successfully", body = StdResponse<FabricEntity, String>),
        (status = 404, description = "Fabric not found")
    )
)]
async fn delete_fabric(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let fabric: FabricEntity = diesel::delete(fabrics::table.find(id))
        .returning(FabricEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(fabric_id = %fabric.id, "Deleted fabric");

    Ok(StdResponse {
        data: Some(fabric),
        message: Some("Delete fabric successfully"),
    })
}
