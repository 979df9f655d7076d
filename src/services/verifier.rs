use std::sync::Arc;

use crate::crypto::token::TokenKeys;
use crate::error::Result;
use crate::models::user::User;
use crate::repositories::user::UserStore;

/// Resolves presented session tokens to live users.
#[derive(Clone)]
pub struct TokenVerifier {
    store: Arc<dyn UserStore>,
    keys: Arc<TokenKeys>,
}

impl TokenVerifier {
    pub fn new(store: Arc<dyn UserStore>, keys: Arc<TokenKeys>) -> Self {
        Self { store, keys }
    }

    /// Returns the freshly fetched user a token belongs to, or `None` if the
    /// token is malformed, forged, expired, revoked, or its user is gone.
    ///
    /// Only store failures are errors.
    pub async fn verify(&self, token: &str) -> Result<Option<User>> {
        let claims = match self.keys.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("❌ Token rejected: {}", e);
                return Ok(None);
            }
        };

        let Some(user) = self.store.find_by_id(claims.user.id).await? else {
            tracing::warn!("❌ Token for unknown user: {}", claims.user.id);
            return Ok(None);
        };

        if user.token_epoch != claims.epoch {
            tracing::debug!(
                "❌ Revoked token for user {} (epoch {} != {})",
                user.id,
                claims.epoch,
                user.token_epoch
            );
            return Ok(None);
        }

        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::test_hasher;
    use crate::models::user::Role;
    use crate::error::AppError;
    use crate::repositories::memory::InMemoryUserStore;
    use crate::repositories::user::UnavailableStore;
    use crate::services::auth::{ChangePasswordOutcome, CredentialIssuer};
    use chrono::{Duration, Utc};

    const SECRET: &[u8] = b"unit-test-secret-unit-test-secret!";

    fn setup() -> (InMemoryUserStore, CredentialIssuer, TokenVerifier, Arc<TokenKeys>) {
        let store = InMemoryUserStore::new();
        let keys = Arc::new(TokenKeys::new(SECRET, Duration::days(7)));
        let issuer = CredentialIssuer::new(
            Arc::new(store.clone()),
            Arc::new(test_hasher()),
            keys.clone(),
        )
        .unwrap();
        let verifier = TokenVerifier::new(Arc::new(store.clone()), keys.clone());
        (store, issuer, verifier, keys)
    }

    #[tokio::test]
    async fn registered_token_verifies_to_user() {
        let (_, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();

        let user = verifier.verify(&issued.token).await.unwrap().unwrap();
        assert_eq!(user.id, issued.user.id);
        assert_eq!(user.name, "Alice");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, Role::Employee);
    }

    #[tokio::test]
    async fn login_token_verifies() {
        let (_, issuer, verifier, _) = setup();
        issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        let issued = issuer.login("a@x.com", "secret1234").await.unwrap();

        assert!(verifier.verify(&issued.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        let (_, issuer, verifier, keys) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        let stale = keys
            .issue_at(&issued.user, Utc::now() - Duration::days(7) - Duration::seconds(1))
            .unwrap();

        assert!(verifier.verify(&stale).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleted_user_is_unauthenticated() {
        let (store, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        assert!(store.remove(issued.user.id).await);

        assert!(verifier.verify(&issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_and_malformed_tokens_are_unauthenticated() {
        let (_, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        let foreign = TokenKeys::new(b"some-other-secret-some-other-secret", Duration::days(7))
            .issue(&issued.user)
            .unwrap();

        assert!(verifier.verify(&foreign).await.unwrap().is_none());
        assert!(verifier.verify("garbage").await.unwrap().is_none());
        assert!(verifier.verify("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn returns_fresh_identity_not_token_copy() {
        let (_, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        issuer.set_role(issued.user.id, Role::Admin).await.unwrap();
        issuer.update_profile(issued.user.id, "Alicia").await.unwrap();

        let user = verifier.verify(&issued.token).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, "Alicia");
    }

    #[tokio::test]
    async fn password_change_keeps_old_tokens_valid() {
        let (_, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        let outcome = issuer
            .change_password(issued.user.id, "secret1234", "newsecret99")
            .await
            .unwrap();
        assert_eq!(outcome, ChangePasswordOutcome::Changed);

        assert!(verifier.verify(&issued.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn revocation_invalidates_earlier_tokens_only() {
        let (_, issuer, verifier, _) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        issuer.revoke_sessions(issued.user.id).await.unwrap();

        assert!(verifier.verify(&issued.token).await.unwrap().is_none());

        let fresh = issuer.login("a@x.com", "secret1234").await.unwrap();
        assert!(verifier.verify(&fresh.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_an_anonymous_caller() {
        let (_, issuer, _, keys) = setup();
        let issued = issuer.register("Alice", "a@x.com", "secret1234", None).await.unwrap();
        let verifier = TokenVerifier::new(Arc::new(UnavailableStore), keys);

        let err = verifier.verify(&issued.token).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
