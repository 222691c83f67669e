use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::checkout::{CustomerContact, DeliveryAddress, Measurements, ProfileDefaults};
use crate::models::CustomerEntity;

/// Identity as reported by the hosted identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Customer-facing view of a profile with its documents decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CustomerProfile {
    pub uid: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<DeliveryAddress>,
    pub measurements: Option<Measurements>,
}

impl CustomerProfile {
    /// Profile assembled from the identity alone, used when the database cannot be reached.
    pub fn stand_in(identity: &Identity) -> Self {
        let email = identity.email.clone().unwrap_or_default();
        let full_name = identity
            .display_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Self {
            uid: identity.uid.clone(),
            email,
            full_name,
            phone: identity.phone_number.clone(),
            address: None,
            measurements: None,
        }
    }

    pub fn contact(&self) -> CustomerContact {
        CustomerContact {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    pub fn defaults(&self) -> ProfileDefaults {
        ProfileDefaults {
            contact: self.contact(),
            address: self.address.clone(),
            measurements: self.measurements.clone(),
        }
    }
}

impl From<CustomerEntity> for CustomerProfile {
    /// Documents that no longer decode are dropped rather than failing the profile.
    fn from(entity: CustomerEntity) -> Self {
        Self {
            uid: entity.uid,
            email: entity.email,
            full_name: entity.full_name,
            phone: entity.phone,
            address: entity
                .address
                .and_then(|value| serde_json::from_value(value).ok()),
            measurements: entity
                .measurements
                .and_then(|value| serde_json::from_value(value).ok()),
        }
    }
}

/// Outcome of looking up the profile behind an identity.
#[derive(Debug, Clone)]
pub enum ProfileLookup {
    Found(CustomerProfile),
    Missing,
    /// The profile store could not be reached at all.
    Unavailable,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Session {
    Anonymous,
    Customer {
        profile: CustomerProfile,
        /// False when the profile is a stand-in that has not been saved.
        persisted: bool,
    },
}

impl Session {
    pub fn is_customer(&self) -> bool {
        matches!(self, Self::Customer { .. })
    }
}

/// Decide what a caller is, given their identity and the profile lookup result.
///
/// An identity without a profile (an admin account, say) is anonymous to the storefront.
pub fn resolve_session(identity: Option<&Identity>, lookup: ProfileLookup) -> Session {
    let Some(identity) = identity else {
        return Session::Anonymous;
    };

    match lookup {
        ProfileLookup::Found(profile) => Session::Customer {
            profile,
            persisted: true,
        },
        ProfileLookup::Unavailable => {
            tracing::warn!(uid = %identity.uid, "Profile store unavailable, using stand-in profile");
            Session::Customer {
                profile: CustomerProfile::stand_in(identity),
                persisted: false,
            }
        }
        ProfileLookup::Missing => Session::Anonymous,
        ProfileLookup::Failed(reason) => {
            tracing::warn!(uid = %identity.uid, reason = %reason, "Profile lookup failed");
            Session::Anonymous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            uid: "uid-42".into(),
            email: Some("kemi@example.com".into()),
            display_name: None,
            phone_number: Some("+2348000000000".into()),
        }
    }

    fn profile() -> CustomerProfile {
        CustomerProfile {
            uid: "uid-42".into(),
            email: "kemi@example.com".into(),
            full_name: "Kemi Adebayo".into(),
            phone: None,
            address: None,
            measurements: None,
        }
    }

    #[test]
    fn test_no_identity_is_anonymous() {
        assert_eq!(
            resolve_session(None, ProfileLookup::Found(profile())),
            Session::Anonymous
        );
    }

    #[test]
    fn test_found_profile_is_customer() {
        let session = resolve_session(Some(&identity()), ProfileLookup::Found(profile()));
        assert_eq!(
            session,
            Session::Customer {
                profile: profile(),
                persisted: true
            }
        );
    }

    #[test]
    fn test_identity_without_profile_is_anonymous() {
        let session = resolve_session(Some(&identity()), ProfileLookup::Missing);
        assert_eq!(session, Session::Anonymous);
        assert!(!session.is_customer());

        let session = resolve_session(
            Some(&identity()),
            ProfileLookup::Failed("relation does not exist".into()),
        );
        assert_eq!(session, Session::Anonymous);
    }

    #[test]
    fn test_unavailable_store_yields_unpersisted_stand_in() {
        let session = resolve_session(Some(&identity()), ProfileLookup::Unavailable);
        let Session::Customer { profile, persisted } = session else {
            panic!("expected a customer session");
        };
        assert!(!persisted);
        assert_eq!(profile.uid, "uid-42");
        assert_eq!(profile.full_name, "kemi");
        assert_eq!(profile.phone.as_deref(), Some("+2348000000000"));
    }

    #[test]
    fn test_session_serializes_with_state_tag() {
        let json = serde_json::to_value(Session::Anonymous).unwrap();
        assert_eq!(json, serde_json::json!({"state": "anonymous"}));
    }
}
