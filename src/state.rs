use std::sync::Arc;

use crate::config::Config;
use crate::crypto::password::{Argon2Hasher, CredentialHasher};
use crate::crypto::token::TokenKeys;
use crate::error::Result;
use crate::repositories::memory::InMemoryUserStore;
use crate::repositories::user::{PgUserStore, UserStore};
use crate::services::auth::CredentialIssuer;
use crate::services::verifier::TokenVerifier;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Registration, login and account changes.
    pub issuer: CredentialIssuer,
    /// Resolves bearer tokens to users.
    pub verifier: TokenVerifier,
}

impl AppState {
    /// Creates a new `AppState`, connecting to Postgres when `DATABASE_URL`
    /// is configured and falling back to the in-memory store otherwise.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let pool = crate::db::create_pool(url)?;
                crate::db::ensure_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL Pool initialized with deadpool-postgres");
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL not set, users are kept in memory");
                Arc::new(InMemoryUserStore::new())
            }
        };

        let hasher = Arc::new(Argon2Hasher::new()?);
        let state = Self::with_parts(config.clone(), store, hasher)?;
        state.bootstrap_admin().await?;
        Ok(state)
    }

    /// Creates or promotes the configured administrator, if there is one.
    ///
    /// This is the only path to an admin account besides an existing admin.
    pub async fn bootstrap_admin(&self) -> Result<()> {
        let Some(seed) = &self.config.admin_seed else {
            return Ok(());
        };

        let admin = self
            .issuer
            .ensure_admin(&seed.name, &seed.email, &seed.password)
            .await?;
        tracing::info!("✅ Administrator ready: {}", admin.email);
        Ok(())
    }

    /// Assembles the state from explicit collaborators.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self> {
        let keys = Arc::new(TokenKeys::new(
            &config.jwt_secret,
            chrono::Duration::days(config.token_ttl_days),
        ));

        let issuer = CredentialIssuer::new(store.clone(), hasher, keys.clone())?;
        let verifier = TokenVerifier::new(store, keys);
        tracing::info!("✅ Token keys initialized ({} day lifetime)", config.token_ttl_days);

        Ok(AppState {
            config,
            issuer,
            verifier,
        })
    }
}
