use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::FabricEntity,
    schema::fabrics,
};

use super::CategoryQuery;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/fabrics",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_fabrics))
            .routes(utoipa_axum::routes!(get_fabric)),
    )
}

/// List fabrics, optionally filtered by category.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Fabrics"],
    params(CategoryQuery),
    responses(
        (status = 200, description = "List fabrics", body = StdResponse<Vec<FabricEntity>, String>)
    )
)]
async fn get_fabrics(
    Query(query): Query<CategoryQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut fabrics_query = fabrics::table.order_by(fabrics::name.asc()).into_boxed();
    if let Some(category) = query.category {
        fabrics_query = fabrics_query.filter(fabrics::category.eq(category));
    }

    let fabrics: Vec<FabricEntity> = fabrics_query
        .get_results(conn)
        .await
        .context("Failed to get fabrics")?;

    Ok(StdResponse {
        data: Some(fabrics),
        message: Some("Get fabrics successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Fabrics"],
    params(
        ("id" = Uuid, Path, description = "Fabric ID to fetch")
    ),
    responses(
        (status = 200, description = "Get fabric successfully", body = StdResponse<FabricEntity, String>),
        (status = 404, description = "Fabric not found")
    )
)]
async fn get_fabric(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let fabric: FabricEntity = fabrics::table.find(id).get_result(conn).await?;

    Ok(StdResponse {
        data: Some(fabric),
        message: Some("Get fabric successfully"),
    })
}
