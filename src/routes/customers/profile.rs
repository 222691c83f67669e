use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use diesel::{OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    domain::{
        checkout::{self, DeliveryAddress, Measurements},
        session::{CustomerProfile, Identity},
    },
    middleware,
    models::{CreateCustomerEntity, CustomerEntity, UpdateCustomerEntity, to_document},
    schema::customers,
};

/// Profile of the signed-in identity. Any verified identity may create one.
pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/me",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_profile, upsert_profile))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::identity_authorization,
            )),
    )
}

/// Fetch the signed-in customer's profile.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Customers"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get profile successfully", body = StdResponse<CustomerProfile, String>),
        (status = 404, description = "No profile saved for this identity")
    )
)]
async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let customer: CustomerEntity = customers::table
        .find(&identity.uid)
        .get_result(conn)
        .await?;

    Ok(StdResponse {
        data: Some(CustomerProfile::from(customer)),
        message: Some("Get profile successfully"),
    })
}

/// Fields left out keep their saved value, or the identity's value for a new profile.
#[derive(Deserialize, ToSchema, Debug)]
pub struct UpsertProfileReq {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<DeliveryAddress>,
    pub measurements: Option<Measurements>,
}

impl UpsertProfileReq {
    fn apply(self, mut profile: CustomerProfile) -> CustomerProfile {
        if let Some(full_name) = self.full_name {
            profile.full_name = full_name.trim().to_string();
        }
        if let Some(email) = self.email {
            profile.email = email.trim().to_string();
        }
        if self.phone.is_some() {
            profile.phone = self.phone;
        }
        if self.address.is_some() {
            profile.address = self.address;
        }
        if self.measurements.is_some() {
            profile.measurements = self.measurements;
        }
        profile
    }
}

/// Create or update the signed-in customer's profile.
#[utoipa::path(
    put,
    path = "/",
    tags = ["Customers"],
    security(("bearerAuth" = [])),
    request_body = UpsertProfileReq,
    responses(
        (status = 200, description = "Saved profile successfully", body = StdResponse<CustomerProfile, String>),
        (status = 400, description = "Invalid profile")
    )
)]
async fn upsert_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UpsertProfileReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let existing: Option<CustomerEntity> = customers::table
        .find(&identity.uid)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to look up customer")?;

    let base = existing
        .map(CustomerProfile::from)
        .unwrap_or_else(|| CustomerProfile::stand_in(&identity));
    let profile = body.apply(base);

    checkout::validate_contact(&profile.contact())?;
    if let Some(address) = &profile.address {
        checkout::validate_address(address)?;
    }
    if let Some(measurements) = &profile.measurements {
        checkout::validate_measurements(measurements)?;
    }

    let address = profile.address.as_ref().map(to_document).transpose()?;
    let measurements = profile.measurements.as_ref().map(to_document).transpose()?;

    let customer: CustomerEntity = diesel::insert_into(customers::table)
        .values(CreateCustomerEntity {
            uid: identity.uid.clone(),
            email: profile.email.clone(),
            full_name: profile.full_name.clone(),
            phone: profile.phone.clone(),
            address: address.clone(),
            measurements: measurements.clone(),
        })
        .on_conflict(customers::uid)
        .do_update()
        .set(UpdateCustomerEntity {
            email: profile.email,
            full_name: profile.full_name,
            phone: profile.phone,
            address,
            measurements,
            updated_at: Utc::now(),
        })
        .returning(CustomerEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to save customer profile")?;

    tracing::info!(uid = %customer.uid, "Saved customer profile");

    Ok(StdResponse {
        data: Some(CustomerProfile::from(customer)),
        message: Some("Saved profile successfully"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::checkout::MeasurementUnit;

    fn saved() -> CustomerProfile {
        CustomerProfile {
            uid: "uid-7".into(),
            email: "tolu@example.com".into(),
            full_name: "Tolu Bello".into(),
            phone: Some("+2348011111111".into()),
            address: None,
            measurements: Some(Measurements {
                unit: MeasurementUnit::Cm,
                values: BTreeMap::from([("chest".to_string(), 100.0)]),
            }),
        }
    }

    #[test]
    fn test_omitted_fields_keep_saved_values() {
        let req = UpsertProfileReq {
            full_name: Some("  Tolu B. Bello ".into()),
            email: None,
            phone: None,
            address: None,
            measurements: None,
        };

        let profile = req.apply(saved());
        assert_eq!(profile.full_name, "Tolu B. Bello");
        assert_eq!(profile.email, "tolu@example.com");
        assert_eq!(profile.phone.as_deref(), Some("+2348011111111"));
        assert!(profile.measurements.is_some());
    }

    #[test]
    fn test_supplied_documents_replace_saved_ones() {
        let req = UpsertProfileReq {
            full_name: None,
            email: None,
            phone: None,
            address: None,
            measurements: Some(Measurements {
                unit: MeasurementUnit::In,
                values: BTreeMap::from([("waist".to_string(), 32.0)]),
            }),
        };

        let profile = req.apply(saved());
        let measurements = profile.measurements.unwrap();
        assert_eq!(measurements.unit, MeasurementUnit::In);
        assert!(!measurements.values.contains_key("chest"));
    }
}
