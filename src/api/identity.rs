use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::{app_error::AppError, domain::session::Identity};

#[derive(Serialize)]
struct VerifyTokenReq<'a> {
    token: &'a str,
}

/// Ask the identity provider who a bearer token belongs to.
///
/// Returns `Ok(None)` when the provider rejects the token.
pub async fn verify_token(
    client: &Client,
    base_url: &str,
    token: &str,
) -> Result<Option<Identity>, AppError> {
    let url = format!("{}/verify", base_url.trim_end_matches('/'));
    let response = client
        .post(url)
        .json(&VerifyTokenReq { token })
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("IdentityService".into()))?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
        status if !status.is_success() => {
            return Err(anyhow::anyhow!("Identity service responded with {status}").into());
        }
        _ => {}
    }

    let identity: Identity = response
        .json()
        .await
        .context("Failed to parse identity")?;

    Ok(Some(identity))
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::test_support::{self, BROKEN_TOKEN, CUSTOMER_TOKEN, CUSTOMER_UID};

    #[tokio::test]
    async fn test_valid_token_returns_identity() {
        let base_url = test_support::spawn_identity_provider().await;
        let identity = verify_token(&Client::new(), &base_url, CUSTOMER_TOKEN)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.uid, CUSTOMER_UID);
        assert_eq!(identity.display_name.as_deref(), Some("Amaka Eze"));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let base_url = test_support::spawn_identity_provider().await;
        let identity = verify_token(&Client::new(), &format!("{base_url}/"), CUSTOMER_TOKEN)
            .await
            .unwrap();
        assert!(identity.is_some());
    }

    #[tokio::test]
    async fn test_rejected_token_returns_none() {
        let base_url = test_support::spawn_identity_provider().await;
        let identity = verify_token(&Client::new(), &base_url, "expired")
            .await
            .unwrap();
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_is_internal() {
        let base_url = test_support::spawn_identity_provider().await;
        let err = verify_token(&Client::new(), &base_url, BROKEN_TOKEN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Other(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = verify_token(&Client::new(), &format!("http://{addr}"), CUSTOMER_TOKEN)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ServiceUnreachable(ref name) if name == "IdentityService"));
    }
}
