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
    domain::checkout::CustomizationOption,
    middleware,
    models::{CreateServiceEntity, ServiceEntity, UpdateServiceEntity, to_document},
    schema::tailoring_services,
};

use super::{require_amount, require_text};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/services",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_service))
            .routes(utoipa_axum::routes!(update_service))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

fn validate_options(options: &[CustomizationOption]) -> Result<(), AppError> {
    for (i, option) in options.iter().enumerate() {
        require_text("option", &option.option)?;
        if options[..i].iter().any(|other| other.option == option.option) {
            return Err(AppError::BadRequest(format!(
                "Option {} is listed twice",
                option.option
            )));
        }
        if option.choices.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Option {} has no choices",
                option.option
            )));
        }
        for choice in &option.choices {
            require_text("choice", &choice.value)?;
            require_amount("surcharge", choice.surcharge)?;
        }
    }
    Ok(())
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateServiceReq {
    pub name: String,
    pub description: Option<String>,
    pub base_price: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub customization_options: Vec<CustomizationOption>,
}

fn default_active() -> bool {
    true
}

/// Add a tailoring service.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    request_body = CreateServiceReq,
    responses(
        (status = 201, description = "Created service successfully", body = StdResponse<ServiceEntity, String>),
        (status = 400, description = "Invalid service")
    )
)]
async fn create_service(
    State(state): State<AppState>,
    Json(body): Json<CreateServiceReq>,
) -> Result<impl IntoResponse, AppError> {
    require_text("name", &body.name)?;
    require_amount("base_price", body.base_price)?;
    validate_options(&body.customization_options)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let service = diesel::insert_into(tailoring_services::table)
        .values(CreateServiceEntity {
            name: body.name,
            description: body.description,
            base_price: body.base_price,
            active: body.active,
            customization_options: to_document(&body.customization_options)?,
        })
        .returning(ServiceEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create service")?;

    tracing::info!(service_id = %service.id, "Created service");

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(service),
            message: Some("Create service successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateServiceReq {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<f64>,
    /// Inactive services are hidden from the catalog and refused at checkout.
    pub active: Option<bool>,
    pub customization_options: Option<Vec<CustomizationOption>>,
}

/// Update a service. Services are retired by deactivating them.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Service ID to update")
    ),
    request_body = UpdateServiceReq,
    responses(
        (status = 200, description = "Updated service successfully", body = StdResponse<ServiceEntity, String>),
        (status = 404, description = "Service not found")
    )
)]
async fn update_service(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<UpdateServiceReq>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(name) = &body.name {
        require_text("name", name)?;
    }
    if let Some(base_price) = body.base_price {
        require_amount("base_price", base_price)?;
    }
    let customization_options = match &body.customization_options {
        Some(options) => {
            validate_options(options)?;
            Some(to_document(options)?)
        }
        None => None,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let service: ServiceEntity = diesel::update(tailoring_services::table.find(id))
        .set(UpdateServiceEntity {
            name: body.name,
            description: body.description,
            base_price: body.base_price,
            active: body.active,
            customization_options,
            updated_at: Some(Utc::now()),
        })
        .returning(ServiceEntity::as_returning())
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(service),
        message: Some("Update service successfully"),
    })
}
